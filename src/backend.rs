//! Session-backed news operations
//!
//! [`Backend`] runs each operation under the origin's connection lock and
//! turns wire data into parsed records. It applies no deadline and no
//! decode stages; [`NewsClient`](crate::NewsClient) adds both.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::article::{Article, ArticleId, Draft, Overview, RawArticle, parse_article, parse_overview};
use crate::config::Origin;
use crate::error::Result;
use crate::group::{Group, GroupInfo};
use crate::protocol::ProtocolFactory;
use crate::range::{OverviewSource, Range, Window, paginate};
use crate::session::{Session, SessionManager};

#[async_trait]
impl OverviewSource for Session {
    async fn fetch(&mut self, window: &Window) -> Result<Vec<Overview>> {
        let result = self.xover(&window.wire_range()).await;
        let rows = self.check(result)?;
        Ok(rows.iter().map(parse_overview).collect())
    }
}

/// Remote operations over shared per-origin sessions
///
/// Cheap to clone; clones share the connection table.
#[derive(Clone)]
pub struct Backend {
    sessions: Arc<SessionManager>,
}

impl Backend {
    /// Backend over an existing session table
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    /// Backend with its own session table
    pub fn with_factory(
        factory: Arc<dyn ProtocolFactory>,
        idle_recycle: Option<std::time::Duration>,
    ) -> Self {
        Self::new(Arc::new(SessionManager::new(factory, idle_recycle)))
    }

    /// The shared session table
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// All active groups at `origin`, sorted by name
    ///
    /// # Errors
    ///
    /// Connection and protocol failures.
    pub async fn groups(&self, origin: &Origin) -> Result<Vec<GroupInfo>> {
        let mut session = self.sessions.acquire(origin).await?;
        let result = session.protocol().list_active_groups().await;
        let active = session.check(result)?;
        let mut groups: Vec<GroupInfo> = active
            .into_iter()
            .map(|entry| GroupInfo::from_active(origin, entry))
            .collect();
        groups.sort_by(|a, b| Group::by_name(&a.group, &b.group));
        debug!("{} groups at {}", groups.len(), origin.key());
        Ok(groups)
    }

    /// Overview rows of `group` for `range`
    ///
    /// Issues one `GROUP` for the active range, then pages through `XOVER`
    /// windows as described in [`paginate`]. The active range read here is
    /// used for every extension fetch of this call.
    ///
    /// # Errors
    ///
    /// [`NewsError::NoSuchGroup`](crate::NewsError::NoSuchGroup) for an
    /// unknown group, plus connection and protocol failures.
    pub async fn overview(&self, group: &Group, range: &Range) -> Result<Vec<Overview>> {
        let mut session = self.sessions.acquire(&group.origin).await?;
        let result = session.protocol().group(&group.name).await;
        let active = session.check(result)?;
        trace!("{} active {}-{}", group.name, active.low, active.high);
        paginate(range, &active, &mut session).await
    }

    /// Lazy stream of full articles
    ///
    /// Nothing is sent until the first [`ArticleStream::next`]; from then
    /// on the stream holds the origin's connection until it is drained,
    /// closed or dropped.
    pub fn articles(
        &self,
        origin: &Origin,
        articles: impl IntoIterator<Item = (Group, ArticleId)>,
    ) -> ArticleStream {
        ArticleStream {
            sessions: self.sessions.clone(),
            origin: origin.clone(),
            pending: articles.into_iter().collect(),
            session: None,
            closed: false,
        }
    }

    /// Unprocessed `ARTICLE` response
    ///
    /// # Errors
    ///
    /// [`NewsError::NoSuchArticle`](crate::NewsError::NoSuchArticle) plus
    /// connection and protocol failures.
    pub async fn raw(&self, origin: &Origin, id: &str) -> Result<RawArticle> {
        let mut session = self.sessions.acquire(origin).await?;
        let result = session.protocol().article(id).await;
        session.check(result)
    }

    /// Validate and post `draft`
    ///
    /// # Errors
    ///
    /// [`NewsError::InvalidDraft`](crate::NewsError::InvalidDraft) before
    /// any connection is made, plus connection and protocol failures.
    pub async fn post(&self, origin: &Origin, draft: &Draft) -> Result<bool> {
        draft.validate()?;
        let mut session = self.sessions.acquire(origin).await?;
        let result = session.protocol().post(draft).await;
        session.check(result)
    }

    /// Close every connection
    pub async fn stop(&self) {
        self.sessions.disconnect_all().await;
    }
}

/// Sequential, finite stream of articles from one origin
///
/// Acquires the origin's connection on the first [`next`](Self::next) and
/// releases it once the last article was returned, on the first error, on
/// [`close`](Self::close), or when dropped.
pub struct ArticleStream {
    sessions: Arc<SessionManager>,
    origin: Origin,
    pending: VecDeque<(Group, ArticleId)>,
    session: Option<Session>,
    closed: bool,
}

impl ArticleStream {
    /// Next article, or `None` once the stream is finished
    ///
    /// An error ends the stream.
    pub async fn next(&mut self) -> Option<Result<Article>> {
        if self.closed {
            return None;
        }
        let Some((group, id)) = self.pending.pop_front() else {
            self.close();
            return None;
        };
        let session = match self.session.take() {
            Some(session) => session,
            None => match self.sessions.acquire(&self.origin).await {
                Ok(session) => session,
                Err(e) => {
                    self.close();
                    return Some(Err(e));
                }
            },
        };
        let session = self.session.insert(session);
        let result = session.protocol().article(&id).await;
        match session.check(result) {
            Ok(raw) => {
                if self.pending.is_empty() {
                    self.close();
                }
                Some(Ok(parse_article(&raw, group)))
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }

    /// Stop early and release the connection
    pub fn close(&mut self) {
        if !self.closed {
            trace!("Closing article stream for {}", self.origin.key());
        }
        self.closed = true;
        self.pending.clear();
        self.session = None;
    }

    /// Whether the stream has finished
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Articles not yet fetched
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Origin the articles come from
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}
