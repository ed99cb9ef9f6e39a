//! Server registry and group subscriptions

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::article::{Article, ArticleId};
use crate::backend::Backend;
use crate::config::Origin;
use crate::error::{NewsError, Result};
use crate::facade::NewsClient;
use crate::group::{Group, GroupInfo};
use crate::pipeline::Pipeline;
use crate::range::Range;

/// A followed group and how far it has been read
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Subscription {
    /// Server key, as returned by [`NewsModel::register_server`]
    pub alias: String,
    /// Group name
    pub group: String,
    /// Highest article number pulled so far
    pub last_number: Option<u64>,
    /// Message-ID of that article
    pub last_id: Option<ArticleId>,
}

/// Registered servers, cached group listings and subscriptions
///
/// Works directly on the [`Backend`], so failures come back as errors
/// instead of fallbacks.
pub struct NewsModel {
    backend: Backend,
    pipeline: Arc<Pipeline>,
    servers: HashMap<String, Origin>,
    groups: HashMap<String, Vec<GroupInfo>>,
    subs: Vec<Subscription>,
}

impl NewsModel {
    /// Empty model over `backend`; pulled articles go through `pipeline`
    pub fn new(backend: Backend, pipeline: Arc<Pipeline>) -> Self {
        Self {
            backend,
            pipeline,
            servers: HashMap::new(),
            groups: HashMap::new(),
            subs: Vec::new(),
        }
    }

    /// Model sharing a client's backend and pipeline
    pub fn from_client(client: &NewsClient) -> Self {
        Self::new(client.backend().clone(), client.pipeline().clone())
    }

    /// Add or replace a server; returns its key
    ///
    /// Replacing a server drops its cached group listing.
    pub fn register_server(&mut self, origin: Origin) -> String {
        let alias = origin.key();
        self.groups.remove(&alias);
        self.servers.insert(alias.clone(), origin);
        alias
    }

    /// Registered server for `alias`
    ///
    /// # Errors
    ///
    /// [`NewsError::UnknownOrigin`] when `alias` was never registered.
    pub fn server(&self, alias: &str) -> Result<&Origin> {
        self.servers
            .get(alias)
            .ok_or_else(|| NewsError::UnknownOrigin(alias.to_string()))
    }

    /// Active groups at `alias`, fetched once and cached
    ///
    /// # Errors
    ///
    /// [`NewsError::UnknownOrigin`] plus any listing failure; failures are
    /// not cached.
    pub async fn groups(&mut self, alias: &str) -> Result<&[GroupInfo]> {
        if !self.groups.contains_key(alias) {
            let origin = self.server(alias)?.clone();
            let listing = self.backend.groups(&origin).await?;
            self.groups.insert(alias.to_string(), listing);
        }
        Ok(self.groups.get(alias).map(Vec::as_slice).unwrap_or_default())
    }

    /// Follow `group` at `alias`
    ///
    /// Returns `false` when already subscribed.
    ///
    /// # Errors
    ///
    /// [`NewsError::NoSuchGroup`] when the group is not in the server's
    /// active list, [`NewsError::UnknownOrigin`] for an unknown alias.
    pub async fn subscribe(&mut self, alias: &str, group: &str) -> Result<bool> {
        if self.subs.iter().any(|s| s.alias == alias && s.group == group) {
            return Ok(false);
        }
        let active = self.groups(alias).await?.iter().any(|g| g.name() == group);
        if !active {
            return Err(NewsError::NoSuchGroup(format!("{group} at {alias}")));
        }
        self.subs.push(Subscription {
            alias: alias.to_string(),
            group: group.to_string(),
            last_number: None,
            last_id: None,
        });
        Ok(true)
    }

    /// Current subscriptions, in subscription order
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subs
    }

    /// Fetch unread articles of every subscription
    ///
    /// Each group is read from just after its last pulled article, limited
    /// by `slice` as in [`Range`]. Subscriptions advance as their articles
    /// arrive.
    ///
    /// # Errors
    ///
    /// The first failure stops the pull; subscriptions handled before it
    /// keep their progress.
    pub async fn pull(&mut self, slice: Option<i64>) -> Result<Vec<Article>> {
        let mut pulled = Vec::new();
        for index in 0..self.subs.len() {
            let sub = &self.subs[index];
            let origin = self.server(&sub.alias)?.clone();
            let group = Group::new(origin.clone(), sub.group.clone());
            let range = Range {
                low: sub.last_number.map(|n| n + 1),
                high: None,
                slice,
            };

            let overview = self.backend.overview(&group, &range).await?;
            if overview.is_empty() {
                continue;
            }
            debug!("Pulling {} articles from {}", overview.len(), group.name);

            let mut stream = self.backend.articles(
                &origin,
                overview.iter().map(|o| (group.clone(), o.id.clone())),
            );
            for row in &overview {
                let Some(item) = stream.next().await else {
                    break;
                };
                let mut article = item?;
                article.number = row.number;
                self.pipeline.apply_article(&mut article);
                pulled.push(article);

                let sub = &mut self.subs[index];
                if row.number > sub.last_number {
                    sub.last_number = row.number;
                    sub.last_id = Some(row.id.clone());
                }
            }
        }
        Ok(pulled)
    }
}
