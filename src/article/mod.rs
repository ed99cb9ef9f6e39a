//! Article model and header parsing
//!
//! This module is organized into:
//! - `types`: overview and article records, authors, content types, extensions
//! - `parsing`: header, overview row and `LIST OVERVIEW.FMT` parsing
//! - `attachment`: attachments split out of multipart bodies and their naming
//! - `draft`: outgoing articles for POST

mod attachment;
mod draft;
mod parsing;
mod types;

pub use self::attachment::{
    Attachment, CollatedAttachment, collate_attachment_names, collate_attachments,
};
pub use self::draft::Draft;
pub use self::parsing::{
    OverviewFormat, header_map, parse_article, parse_author, parse_content_type, parse_date,
    parse_headers, parse_message_id, parse_overview, split_list, split_params, split_path,
};
pub use self::types::{
    Article, ArticleId, Author, ContentType, Extensions, Headers, Overview, RawArticle,
    RawOverview, un_re,
};
