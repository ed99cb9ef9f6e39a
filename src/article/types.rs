//! Article type definitions
//!
//! This module contains the in-memory model handed to callers: overview
//! records from XOVER, full articles from ARTICLE, and the extension bag the
//! decode pipeline fills in.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use super::attachment::Attachment;
use crate::group::Group;

/// Message identifier, including the angle brackets (e.g. `<abc@example.com>`)
pub type ArticleId = String;

/// One XOVER row keyed by lower-case field name
///
/// Keys follow the server's overview format (`number`, `subject`, `from`,
/// `date`, `message-id`, `references`, `bytes`, `lines`, ...).
pub type RawOverview = HashMap<String, String>;

/// Unprocessed ARTICLE response: header lines and body lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArticle {
    /// Header lines as sent by the server (possibly folded)
    pub headers: Vec<String>,
    /// Body lines
    pub body: Vec<String>,
}

impl RawArticle {
    /// Split ARTICLE response lines at the first empty line
    ///
    /// ```
    /// use nntp_reader::RawArticle;
    ///
    /// let lines = vec!["Subject: hi".to_string(), String::new(), "body".to_string()];
    /// let raw = RawArticle::from_lines(lines);
    /// assert_eq!(raw.headers, vec!["Subject: hi"]);
    /// assert_eq!(raw.body, vec!["body"]);
    /// ```
    pub fn from_lines(mut lines: Vec<String>) -> Self {
        match lines.iter().position(|l| l.is_empty()) {
            Some(blank) => {
                let body = lines.split_off(blank + 1);
                lines.truncate(blank);
                Self {
                    headers: lines,
                    body,
                }
            }
            None => Self {
                headers: lines,
                body: Vec::new(),
            },
        }
    }
}

/// Author of an article
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Author {
    /// Display name, possibly quoted or encoded
    pub name: String,
    /// Mail address
    pub email: String,
}

impl Author {
    /// Name to show for this author: the unquoted display name, or the address
    ///
    /// ```
    /// use nntp_reader::Author;
    ///
    /// let from = Author { name: "\"Jane Doe\"".into(), email: "jane@example.com".into() };
    /// assert_eq!(from.display_name(), "Jane Doe");
    ///
    /// let anon = Author { name: String::new(), email: "anon@example.com".into() };
    /// assert_eq!(anon.display_name(), "anon@example.com");
    /// ```
    pub fn display_name(&self) -> &str {
        let name = unquote(self.name.trim());
        if name.is_empty() { &self.email } else { name }
    }
}

/// Strip one pair of surrounding double quotes
pub(crate) fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Strip any number of leading `Re:` prefixes (case-insensitive)
///
/// ```
/// use nntp_reader::un_re;
///
/// assert_eq!(un_re("Re: RE:re: Hello"), "Hello");
/// assert_eq!(un_re("Regarding"), "Regarding");
/// ```
pub fn un_re(subject: &str) -> &str {
    let mut rest = subject;
    while rest.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("re:")) {
        rest = rest[3..].trim_start();
    }
    rest
}

/// Parsed `Content-Type` plus the transfer encoding that applies to it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentType {
    /// MIME type, lower-cased (e.g. `text/plain`, `multipart/mixed`)
    pub mime: String,
    /// Multipart boundary, unquoted
    pub boundary: Option<String>,
    /// Character set as given (e.g. `UTF-8`)
    pub charset: Option<String>,
    /// `Content-Transfer-Encoding`, lower-cased
    pub transfer_encoding: Option<String>,
    /// `name` parameter, used as a fallback attachment file name
    pub name: Option<String>,
}

impl ContentType {
    /// Whether the MIME type starts with the given prefix (e.g. `text/`)
    pub fn is(&self, prefix: &str) -> bool {
        self.mime.starts_with(prefix)
    }
}

/// Open, stage-populated extensions attached to overviews and articles
///
/// Each decode stage writes its own keys; no stage may assume another one
/// already ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    /// Set by the multipart stage once the body was split
    pub multipart: bool,
    /// Inline images found in a multipart body
    pub img: Vec<Attachment>,
    /// Other attachments found in a multipart body
    pub attach: Vec<Attachment>,
    /// Signature block removed from the body
    pub sig: Option<String>,
    /// Free-form keys for custom stages
    pub extra: HashMap<String, String>,
}

/// Article overview, as listed by XOVER or derived from full headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
    /// Message-ID
    pub id: ArticleId,
    /// Article number; only present when obtained from a range listing
    pub number: Option<u64>,
    /// Author
    pub from: Author,
    /// Parsed `Date` header; `None` if missing or unparseable
    pub date: Option<DateTime<FixedOffset>>,
    /// Subject line
    pub subject: String,
    /// Message-IDs from `References`
    pub references: Vec<ArticleId>,
    /// `In-Reply-To`, if present
    pub in_reply_to: Option<ArticleId>,
    /// Pipeline extensions
    pub ext: Extensions,
}

/// Parsed article headers (RFC 5536 fields the reader cares about)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers {
    /// Message-ID
    pub id: ArticleId,
    /// Author
    pub from: Author,
    /// Parsed `Date` header
    pub date: Option<DateTime<FixedOffset>>,
    /// Subject line
    pub subject: String,
    /// Message-IDs from `References`
    pub references: Vec<ArticleId>,
    /// `In-Reply-To`
    pub in_reply_to: Option<ArticleId>,
    /// Target newsgroups
    pub newsgroups: Vec<String>,
    /// Transit path elements
    pub path: Vec<String>,
    /// `Lines` header
    pub lines: Option<u64>,
    /// `Content-Type` with `Content-Transfer-Encoding` folded in
    pub content_type: Option<ContentType>,
}

/// Full article within a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Group the article was requested from
    pub group: Group,
    /// Message-ID
    pub id: ArticleId,
    /// Article number, if known
    pub number: Option<u64>,
    /// Author
    pub from: Author,
    /// Parsed `Date` header
    pub date: Option<DateTime<FixedOffset>>,
    /// Subject line
    pub subject: String,
    /// Message-IDs from `References`
    pub references: Vec<ArticleId>,
    /// `In-Reply-To`
    pub in_reply_to: Option<ArticleId>,
    /// Target newsgroups
    pub newsgroups: Vec<String>,
    /// Transit path elements
    pub path: Vec<String>,
    /// `Lines` header
    pub lines: Option<u64>,
    /// Body, lines joined with `\n`
    pub body: String,
    /// Content type of `body`
    pub content_type: Option<ContentType>,
    /// Pipeline extensions
    pub ext: Extensions,
}

impl Article {
    /// Assemble an article from parsed headers and body text
    pub fn compose(headers: Headers, body: String, group: Group) -> Self {
        Self {
            group,
            id: headers.id,
            number: None,
            from: headers.from,
            date: headers.date,
            subject: headers.subject,
            references: headers.references,
            in_reply_to: headers.in_reply_to,
            newsgroups: headers.newsgroups,
            path: headers.path,
            lines: headers.lines,
            body,
            content_type: headers.content_type,
            ext: Extensions::default(),
        }
    }

    /// Overview projection of this article
    pub fn overview(&self) -> Overview {
        Overview {
            id: self.id.clone(),
            number: self.number,
            from: self.from.clone(),
            date: self.date,
            subject: self.subject.clone(),
            references: self.references.clone(),
            in_reply_to: self.in_reply_to.clone(),
            ext: self.ext.clone(),
        }
    }
}
