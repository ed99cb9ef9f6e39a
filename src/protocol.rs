//! Wire protocol seam
//!
//! The engine speaks NNTP through the [`NewsProtocol`] trait, one instance
//! per origin. [`NntpProtocol`] implements it on top of
//! [`nntp_rs::NntpClient`]; tests substitute a scripted implementation
//! through their own [`ProtocolFactory`].

use std::sync::Arc;

use async_trait::async_trait;
use nntp_rs::{NntpClient, NntpError, XoverEntry};
use tracing::{debug, trace, warn};

use crate::article::{Draft, OverviewFormat, RawArticle, RawOverview};
use crate::config::Origin;
use crate::error::{NewsError, Result};
use crate::group::{ActiveGroup, ActiveRange};

/// Primitive NNTP operations the engine relies on
///
/// Every method is called with exclusive access to the connection, so
/// implementations never see interleaved commands.
#[async_trait]
pub trait NewsProtocol: Send {
    /// Open the connection and authenticate when the origin has credentials
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::Connection`] when the server cannot be reached
    /// or rejects the credentials.
    async fn connect_and_authenticate(&mut self) -> Result<()>;

    /// `LIST ACTIVE`
    async fn list_active_groups(&mut self) -> Result<Vec<ActiveGroup>>;

    /// `GROUP`: select `name` and report its active range
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::NoSuchGroup`] for an unknown group.
    async fn group(&mut self, name: &str) -> Result<ActiveRange>;

    /// `LIST OVERVIEW.FMT`
    async fn overview_format(&mut self) -> Result<OverviewFormat>;

    /// `XOVER low-high` in the currently selected group
    async fn xover(&mut self, range: &str, format: &OverviewFormat) -> Result<Vec<RawOverview>>;

    /// `ARTICLE <id>`
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::NoSuchArticle`] when the server has no such article.
    async fn article(&mut self, id: &str) -> Result<RawArticle>;

    /// `POST`; `false` when the server refused the article
    async fn post(&mut self, draft: &Draft) -> Result<bool>;

    /// `QUIT`
    async fn disconnect(&mut self) -> Result<()>;
}

/// Creates one unconnected [`NewsProtocol`] per origin
pub trait ProtocolFactory: Send + Sync {
    /// New protocol instance for `origin`
    fn create(&self, origin: &Origin) -> Box<dyn NewsProtocol>;
}

/// [`NewsProtocol`] over an `nntp-rs` client
pub struct NntpProtocol {
    origin: Origin,
    user_agent: String,
    client: Option<NntpClient>,
}

impl NntpProtocol {
    /// Unconnected protocol for `origin`
    pub fn new(origin: Origin, user_agent: impl Into<String>) -> Self {
        Self {
            origin,
            user_agent: user_agent.into(),
            client: None,
        }
    }

    fn client(&mut self) -> Result<&mut NntpClient> {
        self.client
            .as_mut()
            .ok_or_else(|| NewsError::Connection(format!("{} is not connected", self.origin.key())))
    }
}

/// Overview row from a parsed XOVER entry, keyed like `format`
fn overview_row(entry: XoverEntry, format: &OverviewFormat) -> RawOverview {
    let mut row = RawOverview::new();
    row.insert("number".to_string(), entry.article_number.to_string());
    for name in format.field_names() {
        let value = match name {
            "subject" => entry.subject.clone(),
            "from" => entry.author.clone(),
            "date" => entry.date.clone(),
            "message-id" => entry.message_id.clone(),
            "references" => entry.references.clone(),
            "bytes" => entry.bytes.to_string(),
            "lines" => entry.lines.to_string(),
            _ => continue,
        };
        row.insert(name.to_string(), value);
    }
    row
}

#[async_trait]
impl NewsProtocol for NntpProtocol {
    async fn connect_and_authenticate(&mut self) -> Result<()> {
        debug!("Connecting to {}:{}", self.origin.host, self.origin.port);
        let config = Arc::new(self.origin.server_config());
        let mut client = NntpClient::connect(config)
            .await
            .map_err(|e| NewsError::Connection(e.to_string()))?;
        if self.origin.has_credentials() {
            client
                .authenticate()
                .await
                .map_err(|e| NewsError::Connection(e.to_string()))?;
        }
        self.client = Some(client);
        Ok(())
    }

    async fn list_active_groups(&mut self) -> Result<Vec<ActiveGroup>> {
        let groups = self.client()?.list_active("*").await?;
        Ok(groups
            .into_iter()
            .map(|g| ActiveGroup {
                posting: Some(g.status == "y"),
                name: g.name,
                high: g.high,
                low: g.low,
            })
            .collect())
    }

    async fn group(&mut self, name: &str) -> Result<ActiveRange> {
        let info = self.client()?.select_group(name).await?;
        trace!("GROUP {} -> {}-{} ({})", name, info.first, info.last, info.count);
        Ok(ActiveRange {
            low: info.first,
            high: info.last,
            count: Some(info.count),
        })
    }

    async fn overview_format(&mut self) -> Result<OverviewFormat> {
        match self.client()?.list_overview_fmt().await {
            Ok(lines) if !lines.is_empty() => Ok(OverviewFormat::from_lines(&lines)),
            Ok(_) => Ok(OverviewFormat::default()),
            Err(e @ (NntpError::Io(_) | NntpError::ConnectionClosed | NntpError::Timeout)) => {
                Err(e.into())
            }
            Err(e) => {
                warn!("LIST OVERVIEW.FMT failed on {}, using default layout: {}", self.origin.key(), e);
                Ok(OverviewFormat::default())
            }
        }
    }

    async fn xover(&mut self, range: &str, format: &OverviewFormat) -> Result<Vec<RawOverview>> {
        let entries = self.client()?.fetch_xover(range).await?;
        Ok(entries.into_iter().map(|e| overview_row(e, format)).collect())
    }

    async fn article(&mut self, id: &str) -> Result<RawArticle> {
        let response = self.client()?.fetch_article(id).await?;
        Ok(RawArticle::from_lines(response.lines))
    }

    async fn post(&mut self, draft: &Draft) -> Result<bool> {
        let article = draft
            .builder(&self.user_agent)
            .build()
            .map_err(|e| NewsError::Protocol(e.to_string()))?;
        match self.client()?.post(&article).await {
            Ok(()) => Ok(true),
            Err(NntpError::PostingFailed(reason)) => {
                warn!("Article rejected by {}: {}", self.origin.key(), reason);
                Ok(false)
            }
            Err(NntpError::PostingNotPermitted) => {
                warn!("Posting not permitted on {}", self.origin.key());
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut client) = self.client.take() {
            debug!("Disconnecting from {}", self.origin.key());
            client.quit().await?;
        }
        Ok(())
    }
}

/// Factory producing [`NntpProtocol`] instances
#[derive(Debug, Clone)]
pub struct NntpFactory {
    user_agent: String,
}

impl NntpFactory {
    /// Factory whose protocols post with `user_agent`
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl ProtocolFactory for NntpFactory {
    fn create(&self, origin: &Origin) -> Box<dyn NewsProtocol> {
        Box::new(NntpProtocol::new(origin.clone(), self.user_agent.clone()))
    }
}
