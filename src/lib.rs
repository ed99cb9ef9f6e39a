#![doc = include_str!("../README.md")]

/// Article model, header parsing, attachments and drafts
pub mod article;
mod backend;
/// Attachment transfer-encoding codecs
pub mod codec;
mod config;
mod error;
mod facade;
mod group;
mod news;
/// Decode pipeline and the built-in stages
pub mod pipeline;
mod protocol;
mod range;
mod session;

pub use article::{
    Article, ArticleId, Attachment, Author, CollatedAttachment, ContentType, Draft, Extensions,
    Overview, RawArticle, RawOverview, collate_attachment_names, collate_attachments, un_re,
};
pub use backend::{ArticleStream, Backend};
pub use codec::{Codec, codec};
pub use config::{DEFAULT_IDLE_RECYCLE, DEFAULT_WAIT, EngineConfig, Origin};
pub use error::{NewsError, Result};
pub use facade::{DecodedArticles, NewsClient, Wrapped};
pub use group::{ActiveGroup, ActiveRange, Group, GroupInfo};
pub use news::{NewsModel, Subscription};
pub use pipeline::{Middleware, Pipeline};
pub use protocol::{NewsProtocol, NntpFactory, NntpProtocol, ProtocolFactory};
pub use range::{OverviewSource, Range, Window, paginate, resolve};
pub use session::{Session, SessionManager};
