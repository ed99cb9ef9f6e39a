//! Decode pipeline
//!
//! Overviews and articles come off the wire as lightly parsed records. A
//! [`Pipeline`] runs an ordered list of [`Middleware`] stages over each one
//! before it reaches the caller, repairing encodings and splitting out
//! attachments and signatures.
//!
//! Stages never fail. Malformed input is logged and left as is, so a
//! caller always receives a (possibly degraded) record.
//!
//! # Example
//!
//! ```
//! use nntp_reader::pipeline::{Middleware, Pipeline};
//! use nntp_reader::Article;
//!
//! struct Shout;
//!
//! impl Middleware for Shout {
//!     fn article(&self, article: &mut Article) {
//!         article.subject = article.subject.to_uppercase();
//!     }
//! }
//!
//! let mut pipeline = Pipeline::standard();
//! pipeline.register(Shout);
//! assert_eq!(pipeline.len(), 6);
//! ```

pub mod multipart;
pub mod quoted_printable;
pub mod rfc2047;
pub mod signature;
pub mod windows1252;

use std::fmt;
use std::sync::Arc;

use crate::article::{Article, Overview};

pub use multipart::Multipart;
pub use quoted_printable::QuotedPrintable;
pub use rfc2047::Rfc2047;
pub use signature::Signature;
pub use windows1252::Windows1252;

/// One transform stage
///
/// Both hooks default to doing nothing, so a stage only implements the
/// record kinds it cares about.
pub trait Middleware: Send + Sync {
    /// Transform an overview row in place
    fn overview(&self, _overview: &mut Overview) {}

    /// Transform a full article in place
    fn article(&self, _article: &mut Article) {}
}

/// Ordered, append-only list of stages
///
/// Built once at startup and shared by reference (usually behind an
/// [`Arc`]) with every fetch path. Stages run in registration order and
/// cannot be removed.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    /// Pipeline with no stages
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in stages: multipart split, quoted-printable,
    /// RFC 2047, Windows-1252 patch and signature split, in that order
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline
            .register(Multipart)
            .register(QuotedPrintable)
            .register(Rfc2047)
            .register(Windows1252)
            .register(Signature);
        pipeline
    }

    /// Append a stage
    pub fn register(&mut self, stage: impl Middleware + 'static) -> &mut Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Number of registered stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether no stage is registered
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every overview hook over `overview`
    pub fn apply_overview(&self, overview: &mut Overview) {
        for stage in &self.stages {
            stage.overview(overview);
        }
    }

    /// Run every article hook over `article`
    pub fn apply_article(&self, article: &mut Article) {
        for stage in &self.stages {
            stage.article(article);
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish()
    }
}
