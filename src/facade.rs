//! Deadline-bounded client facade
//!
//! Every remote call made through [`NewsClient`] is raced against the
//! configured wait. The caller always gets a [`Wrapped`] value back:
//! the real result, or a fallback (empty list, `None`, `false`) together
//! with the error that prevented it. Nothing is thrown across this
//! boundary except [`NewsError::UnknownOrigin`] in the layers above.
//!
//! An operation that misses its deadline is not cancelled. It keeps
//! running in the background, finishes its protocol exchange and releases
//! the connection, and its result is discarded.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::article::{Article, ArticleId, Draft, Overview, RawArticle};
use crate::backend::{ArticleStream, Backend};
use crate::config::{EngineConfig, Origin};
use crate::error::{NewsError, Result};
use crate::group::{Group, GroupInfo};
use crate::pipeline::Pipeline;
use crate::protocol::{NntpFactory, ProtocolFactory};
use crate::range::Range;

/// Outcome of a bounded call
///
/// `err` is `None` on success; otherwise `value` holds the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Wrapped<T> {
    /// Result or fallback
    pub value: T,
    /// Why `value` is the fallback
    pub err: Option<NewsError>,
    /// Time until the result (or the timeout) was known
    pub elapsed: Duration,
}

impl<T> Wrapped<T> {
    /// Whether the call succeeded
    pub fn is_ok(&self) -> bool {
        self.err.is_none()
    }

    /// Error code of the failure, if any
    pub fn code(&self) -> Option<&'static str> {
        self.err.as_ref().map(NewsError::code)
    }

    /// Convert to a plain result, dropping the fallback
    pub fn into_result(self) -> Result<T> {
        match self.err {
            None => Ok(self.value),
            Some(err) => Err(err),
        }
    }
}

/// High-level, deadline-bounded news client
///
/// # Example
///
/// ```no_run
/// use nntp_reader::{EngineConfig, Group, NewsClient, Origin, Range};
///
/// # async fn example() {
/// let client = NewsClient::new(EngineConfig::default());
/// let origin = Origin::new("news.example.com");
///
/// let groups = client.groups(&origin, false).await;
/// if let Some(err) = &groups.err {
///     eprintln!("listing failed: {err}");
/// }
///
/// let group = Group::new(origin.clone(), "comp.lang.rust");
/// let latest = client.overview(&group, &Range::latest(20)).await;
/// for o in &latest.value {
///     println!("{} {}", o.id, o.subject);
/// }
///
/// client.stop().await;
/// # }
/// ```
#[derive(Clone)]
pub struct NewsClient {
    backend: Backend,
    pipeline: Arc<Pipeline>,
    config: EngineConfig,
}

impl NewsClient {
    /// Client speaking NNTP through `nntp-rs`, with the standard pipeline
    pub fn new(config: EngineConfig) -> Self {
        let factory = Arc::new(NntpFactory::new(config.user_agent.clone()));
        Self::with_factory(factory, Pipeline::standard(), config)
    }

    /// Client over a custom protocol factory and pipeline
    pub fn with_factory(
        factory: Arc<dyn ProtocolFactory>,
        pipeline: Pipeline,
        config: EngineConfig,
    ) -> Self {
        let backend = Backend::with_factory(factory, config.idle_recycle);
        Self::from_parts(backend, Arc::new(pipeline), config)
    }

    /// Client sharing an existing backend and pipeline
    pub fn from_parts(backend: Backend, pipeline: Arc<Pipeline>, config: EngineConfig) -> Self {
        Self {
            backend,
            pipeline,
            config,
        }
    }

    /// The unbounded backend
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// The decode pipeline
    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn race<T, F>(
        &self,
        op: F,
        what: String,
        fallback: T,
        size: impl Fn(&T) -> usize,
    ) -> Wrapped<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let wait = self.config.wait;
        let start = Instant::now();
        let task = tokio::spawn(op);
        tokio::select! {
            joined = task => {
                let elapsed = start.elapsed();
                let ms = elapsed.as_millis();
                match joined {
                    Ok(Ok(value)) => {
                        info!("resolve ({} ms) {}: {}", ms, what, size(&value));
                        Wrapped { value, err: None, elapsed }
                    }
                    Ok(Err(err)) => {
                        info!("reject ({} ms) {}: {}", ms, what, err);
                        Wrapped { value: fallback, err: Some(err), elapsed }
                    }
                    Err(join) => {
                        warn!("abort ({} ms) {}: {}", ms, what, join);
                        Wrapped {
                            value: fallback,
                            err: Some(NewsError::Aborted(join.to_string())),
                            elapsed,
                        }
                    }
                }
            }
            _ = tokio::time::sleep(wait) => {
                let elapsed = start.elapsed();
                warn!(
                    "waiting too long ({} ms, limit {} ms) for {}",
                    elapsed.as_millis(),
                    wait.as_millis(),
                    what
                );
                Wrapped {
                    value: fallback,
                    err: Some(NewsError::Timeout { wait }),
                    elapsed,
                }
            }
        }
    }

    /// Active groups at `origin`
    ///
    /// `control.*` groups are left out unless `control` is set.
    pub async fn groups(&self, origin: &Origin, control: bool) -> Wrapped<Vec<GroupInfo>> {
        let backend = self.backend.clone();
        let target = origin.clone();
        let mut wrapped = self
            .race(
                async move { backend.groups(&target).await },
                format!("groups for origin {}", origin.host),
                Vec::new(),
                Vec::len,
            )
            .await;
        if !control {
            wrapped.value.retain(|g| !g.group.is_control());
        }
        wrapped
    }

    /// Overview rows of `group` for `range`, passed through the overview stages
    pub async fn overview(&self, group: &Group, range: &Range) -> Wrapped<Vec<Overview>> {
        let backend = self.backend.clone();
        let target = group.clone();
        let range = *range;
        let mut wrapped = self
            .race(
                async move { backend.overview(&target, &range).await },
                format!("overview for {} from origin {}", group.name, group.origin.host),
                Vec::new(),
                Vec::len,
            )
            .await;
        for overview in &mut wrapped.value {
            self.pipeline.apply_overview(overview);
        }
        wrapped
    }

    /// One article, passed through the article stages
    ///
    /// Fetched as the first element of [`articles`](Self::articles); the
    /// stream is closed right after, even when the deadline already passed.
    pub async fn article(&self, origin: &Origin, group: &Group, id: &str) -> Wrapped<Option<Article>> {
        let mut stream = self
            .backend
            .articles(origin, [(group.clone(), id.to_string())]);
        let pipeline = self.pipeline.clone();
        self.race(
            async move {
                let first = stream.next().await;
                stream.close();
                match first {
                    Some(Ok(mut article)) => {
                        pipeline.apply_article(&mut article);
                        Ok(Some(article))
                    }
                    Some(Err(err)) => Err(err),
                    None => Ok(None),
                }
            },
            format!("article {} in {} from origin {}", id, group.name, origin.host),
            None,
            |a: &Option<Article>| a.as_ref().map_or(0, |a| a.body.len()),
        )
        .await
    }

    /// Lazy stream of decoded articles
    ///
    /// Not bounded by the deadline; each element is fetched on demand and
    /// the connection is held until the stream is drained or closed.
    pub fn articles(
        &self,
        origin: &Origin,
        articles: impl IntoIterator<Item = (Group, ArticleId)>,
    ) -> DecodedArticles {
        DecodedArticles {
            inner: self.backend.articles(origin, articles),
            pipeline: self.pipeline.clone(),
        }
    }

    /// Unprocessed article, bypassing the pipeline
    pub async fn raw(&self, origin: &Origin, id: &str) -> Wrapped<Option<RawArticle>> {
        let backend = self.backend.clone();
        let target = origin.clone();
        let article_id = id.to_string();
        self.race(
            async move { backend.raw(&target, &article_id).await.map(Some) },
            format!("raw {} from origin {}", id, origin.host),
            None,
            |r: &Option<RawArticle>| r.as_ref().map_or(0, |r| r.body.len()),
        )
        .await
    }

    /// Post `draft`; `false` with an error when it was not accepted
    pub async fn post(&self, origin: &Origin, draft: &Draft) -> Wrapped<bool> {
        let backend = self.backend.clone();
        let target = origin.clone();
        let draft_owned = draft.clone();
        self.race(
            async move { backend.post(&target, &draft_owned).await },
            format!("post to {} at origin {}", draft.newsgroup, origin.host),
            false,
            |posted: &bool| usize::from(*posted),
        )
        .await
    }

    /// Close every connection
    pub async fn stop(&self) {
        self.backend.stop().await;
    }
}

/// [`ArticleStream`] with the article stages applied to each element
pub struct DecodedArticles {
    inner: ArticleStream,
    pipeline: Arc<Pipeline>,
}

impl DecodedArticles {
    /// Next decoded article, or `None` once finished
    pub async fn next(&mut self) -> Option<Result<Article>> {
        let mut item = self.inner.next().await?;
        if let Ok(article) = item.as_mut() {
            self.pipeline.apply_article(article);
        }
        Some(item)
    }

    /// Stop early and release the connection
    pub fn close(&mut self) {
        self.inner.close();
    }

    /// Whether the stream has finished
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Articles not yet fetched
    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}
