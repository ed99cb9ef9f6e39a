//! Per-origin connection table
//!
//! Each distinct [`Origin::key`] owns one protocol connection behind a
//! fair (FIFO) async mutex, so commands for one origin are never
//! interleaved on the wire while different origins run in parallel.
//! Connections are opened lazily on first acquisition and, when idle
//! recycling is enabled, closed again after a quiet period; the next
//! acquisition reconnects transparently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::article::{OverviewFormat, RawOverview};
use crate::config::Origin;
use crate::error::{NewsError, Result};
use crate::protocol::{NewsProtocol, ProtocolFactory};

struct Connection {
    origin: Origin,
    protocol: Box<dyn NewsProtocol>,
    connected: bool,
    format: OverviewFormat,
    /// Bumped on every (re)connect so stale recycle timers can tell
    generation: u64,
    last_used: Instant,
}

impl Connection {
    async fn open(&mut self) -> Result<()> {
        debug!("Opening connection to {}", self.origin.key());
        self.protocol.connect_and_authenticate().await?;
        self.format = match self.protocol.overview_format().await {
            Ok(format) => format,
            Err(e) => {
                let _ = self.protocol.disconnect().await;
                return Err(e);
            }
        };
        self.connected = true;
        self.generation += 1;
        Ok(())
    }

    async fn close(&mut self) {
        if !self.connected {
            return;
        }
        self.connected = false;
        if let Err(e) = self.protocol.disconnect().await {
            debug!("Disconnect from {} failed: {}", self.origin.key(), e);
        }
    }
}

type Slot = Arc<Mutex<Connection>>;

/// Owner of every live connection
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use nntp_reader::{NntpFactory, Origin, SessionManager};
///
/// # async fn example() -> nntp_reader::Result<()> {
/// let sessions = SessionManager::new(
///     Arc::new(NntpFactory::new("example/1.0")),
///     Some(Duration::from_secs(55)),
/// );
/// let mut session = sessions.acquire(&Origin::new("news.example.com")).await?;
/// let active = session.protocol().group("comp.lang.rust").await?;
/// println!("{}-{}", active.low, active.high);
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    factory: Arc<dyn ProtocolFactory>,
    connections: StdMutex<HashMap<String, Slot>>,
    idle_recycle: Option<Duration>,
}

impl SessionManager {
    /// Empty table; `idle_recycle` of `None` keeps connections open
    pub fn new(factory: Arc<dyn ProtocolFactory>, idle_recycle: Option<Duration>) -> Self {
        Self {
            factory,
            connections: StdMutex::new(HashMap::new()),
            idle_recycle,
        }
    }

    fn slot(&self, origin: &Origin) -> Slot {
        let mut table = self.connections.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .entry(origin.key())
            .or_insert_with(|| {
                trace!("New connection slot for {}", origin.key());
                Arc::new(Mutex::new(Connection {
                    origin: origin.clone(),
                    protocol: self.factory.create(origin),
                    connected: false,
                    format: OverviewFormat::default(),
                    generation: 0,
                    last_used: Instant::now(),
                }))
            })
            .clone()
    }

    /// Exclusive access to the connection for `origin`
    ///
    /// Waits behind earlier holders in arrival order. The first
    /// acquisition (and the first after a recycle) connects, authenticates
    /// and reads the overview format. Dropping the returned [`Session`]
    /// releases the connection on every path, including cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::Connection`] when connecting fails. The
    /// connection stays closed and the next acquisition retries.
    pub async fn acquire(&self, origin: &Origin) -> Result<Session> {
        let slot = self.slot(origin);
        let mut conn = slot.clone().lock_owned().await;
        if !conn.connected {
            conn.open().await?;
            if let Some(idle) = self.idle_recycle {
                tokio::spawn(recycle(Arc::downgrade(&slot), conn.generation, idle));
            }
        }
        Ok(Session { conn })
    }

    /// Number of connections currently open
    pub async fn live_connections(&self) -> usize {
        let mut live = 0;
        for slot in self.slots() {
            if slot.lock().await.connected {
                live += 1;
            }
        }
        live
    }

    fn slots(&self) -> Vec<Slot> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Close every open connection, waiting for current holders first
    ///
    /// Later acquisitions reconnect.
    pub async fn disconnect_all(&self) {
        for slot in self.slots() {
            slot.lock().await.close().await;
        }
    }
}

/// Close the connection once it has been idle for `idle`
///
/// Exits early when the connection is closed or reopened by someone else,
/// or when the slot is gone.
async fn recycle(slot: Weak<Mutex<Connection>>, generation: u64, idle: Duration) {
    let mut deadline = Instant::now() + idle;
    loop {
        tokio::time::sleep_until(deadline).await;
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let mut conn = slot.lock().await;
        if !conn.connected || conn.generation != generation {
            return;
        }
        let due = conn.last_used + idle;
        if due > Instant::now() {
            deadline = due;
            continue;
        }
        debug!("Recycling idle connection to {}", conn.origin.key());
        conn.close().await;
        return;
    }
}

/// Exclusive handle on one origin's connection
///
/// Releases the connection when dropped.
pub struct Session {
    conn: OwnedMutexGuard<Connection>,
}

impl Session {
    /// The connected protocol
    pub fn protocol(&mut self) -> &mut dyn NewsProtocol {
        self.conn.protocol.as_mut()
    }

    /// Origin this session talks to
    pub fn origin(&self) -> &Origin {
        &self.conn.origin
    }

    /// Overview layout read when the connection was opened
    pub fn overview_format(&self) -> &OverviewFormat {
        &self.conn.format
    }

    /// `XOVER` using the connection's overview layout
    pub async fn xover(&mut self, range: &str) -> Result<Vec<RawOverview>> {
        let conn = &mut *self.conn;
        conn.protocol.xover(range, &conn.format).await
    }

    /// Pass `result` through, marking the connection for reconnect when it
    /// reports a connection failure
    pub fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(NewsError::Connection(reason)) = &result {
            warn!("Dropping broken connection to {}: {}", self.conn.origin.key(), reason);
            self.conn.connected = false;
        }
        result
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.conn.last_used = Instant::now();
    }
}
