//! Header and overview parsing
//!
//! Turns raw protocol header lines and XOVER rows into typed fields. Nothing
//! in here fails: malformed values degrade to empty/`None` fields so that a
//! broken header never aborts a fetch.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use super::types::{Article, Author, ContentType, Extensions, Headers, Overview, RawArticle, RawOverview, unquote};
use crate::group::Group;

static MESSAGE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^\s<>]+@[^\s>]+>").expect("valid regex"));

// `Name <addr>`
static NAME_ANGLE_ADDR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(.*?)\s*<([^<>\s]+@[^<>\s]+)>\s*$").expect("valid regex")
});

// `addr (Name)`
static ADDR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s()<>]+@[^\s()<>]+)\s*\((.*)\)\s*$").expect("valid regex")
});

// `addr Name`
static ADDR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([^\s()<>]+@[^\s()<>]+)\s+(.+?)\s*$").expect("valid regex")
});

static BARE_ADDR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^\s<>()]+@[^\s<>()]+)").expect("valid regex"));

/// Extract the first message-id (`<local@domain>`) from a header value
///
/// ```
/// use nntp_reader::article::parse_message_id;
///
/// assert_eq!(parse_message_id("  <abc@example.com> (x)").as_deref(), Some("<abc@example.com>"));
/// assert_eq!(parse_message_id("garbage"), None);
/// ```
pub fn parse_message_id(value: &str) -> Option<String> {
    MESSAGE_ID.find(value).map(|m| m.as_str().to_string())
}

/// Parse a `From` header into name and address
///
/// Understands `Name <addr>`, `addr (Name)`, `addr Name` and a bare
/// address. Anything else is kept as the name with an empty address.
pub fn parse_author(value: &str) -> Author {
    if let Some(c) = NAME_ANGLE_ADDR.captures(value) {
        return Author {
            name: c[1].to_string(),
            email: c[2].to_string(),
        };
    }
    if let Some(c) = ADDR_COMMENT.captures(value) {
        return Author {
            name: c[2].trim().to_string(),
            email: c[1].to_string(),
        };
    }
    if let Some(c) = ADDR_NAME.captures(value) {
        return Author {
            name: c[2].to_string(),
            email: c[1].to_string(),
        };
    }
    if let Some(c) = BARE_ADDR.captures(value) {
        return Author {
            name: String::new(),
            email: c[1].to_string(),
        };
    }
    Author {
        name: value.trim().to_string(),
        email: String::new(),
    }
}

/// Parse an RFC 5322 date, tolerating `GMT`/`UT` zones and trailing comments
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date);
    }
    // "Tue, 20 Jan 2026 12:00:00 +0000 (UTC)"
    let stripped = match value.rfind('(') {
        Some(open) if value.ends_with(')') => value[..open].trim_end(),
        _ => value,
    };
    let normalized = stripped
        .replace(" GMT", " +0000")
        .replace(" UTC", " +0000")
        .replace(" UT", " +0000");
    DateTime::parse_from_rfc2822(&normalized).ok()
}

/// Split a comma and/or whitespace separated list (References, Newsgroups)
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a `Path` header on punctuation and spaces, keeping dots and hyphens
pub fn split_path(value: &str) -> Vec<String> {
    value
        .split(|c: char| (c.is_ascii_punctuation() && c != '.' && c != '-') || c == ' ')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a structured header value into its main value and parameters
///
/// Semicolons inside quoted strings do not split. Parameter names are
/// lower-cased and values unquoted.
///
/// ```
/// use nntp_reader::article::split_params;
///
/// let (value, params) = split_params(r#"attachment; filename="a;b.txt"; size=3"#);
/// assert_eq!(value, "attachment");
/// assert_eq!(params.get("filename").map(String::as_str), Some("a;b.txt"));
/// assert_eq!(params.get("size").map(String::as_str), Some("3"));
/// ```
pub fn split_params(value: &str) -> (String, HashMap<String, String>) {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in value.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            ';' if !quoted => pieces.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    pieces.push(current);

    let mut pieces = pieces.into_iter();
    let main = pieces.next().unwrap_or_default().trim().to_string();
    let mut params = HashMap::new();
    for piece in pieces {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once('=') {
            Some((k, v)) => {
                params.insert(k.trim().to_ascii_lowercase(), unquote(v.trim()).to_string());
            }
            None => {
                params.insert(piece.to_ascii_lowercase(), String::new());
            }
        }
    }
    (main, params)
}

/// Parse a `Content-Type` value, folding in the transfer encoding
pub fn parse_content_type(value: &str, transfer_encoding: Option<&str>) -> ContentType {
    let (mime, mut params) = split_params(value);
    ContentType {
        mime: mime.to_ascii_lowercase(),
        boundary: params.remove("boundary").filter(|b| !b.is_empty()),
        charset: params.remove("charset").filter(|c| !c.is_empty()),
        transfer_encoding: transfer_encoding
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty()),
        name: params.remove("name").filter(|n| !n.is_empty()),
    }
}

/// Collect header lines into a map keyed by lower-cased name
///
/// Continuation lines (starting with whitespace) are unfolded onto the
/// previous header. Lines without a colon are skipped. When a header
/// repeats, the last value wins.
pub fn header_map<S: AsRef<str>>(lines: &[S]) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut current: Option<(String, String)> = None;
    for line in lines {
        let line = line.as_ref();
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = current.take() {
            map.insert(name, value);
        }
        if let Some((name, value)) = line.split_once(':') {
            current = Some((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }
    if let Some((name, value)) = current {
        map.insert(name, value);
    }
    map
}

/// Parse raw header lines into typed [`Headers`]
pub fn parse_headers<S: AsRef<str>>(lines: &[S]) -> Headers {
    let map = header_map(lines);
    let get = |name: &str| map.get(name).map(String::as_str).unwrap_or("");

    let content_type = map
        .get("content-type")
        .map(|ct| parse_content_type(ct, map.get("content-transfer-encoding").map(String::as_str)));

    Headers {
        id: parse_message_id(get("message-id")).unwrap_or_default(),
        from: parse_author(get("from")),
        date: parse_date(get("date")),
        subject: get("subject").to_string(),
        references: split_list(get("references")),
        in_reply_to: parse_message_id(get("in-reply-to")),
        newsgroups: split_list(get("newsgroups")),
        path: split_path(get("path")),
        lines: get("lines").trim().parse().ok(),
        content_type,
    }
}

/// Parse a raw ARTICLE response into an [`Article`] of `group`
pub fn parse_article(raw: &RawArticle, group: Group) -> Article {
    Article::compose(parse_headers(&raw.headers), raw.body.join("\n"), group)
}

/// Parse one XOVER row into an [`Overview`]
///
/// A zero or non-numeric article number is treated as absent.
pub fn parse_overview(row: &RawOverview) -> Overview {
    let get = |name: &str| row.get(name).map(String::as_str).unwrap_or("");
    let id = get("message-id");
    Overview {
        id: parse_message_id(id).unwrap_or_else(|| id.trim().to_string()),
        number: get("number").trim().parse().ok().filter(|n| *n > 0),
        from: parse_author(get("from")),
        date: parse_date(get("date")),
        subject: get("subject").to_string(),
        references: split_list(get("references")),
        in_reply_to: parse_message_id(get("in-reply-to")),
        ext: Extensions::default(),
    }
}

/// Field layout of XOVER rows, from `LIST OVERVIEW.FMT`
///
/// The article number column is implied and always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewFormat {
    fields: Vec<OverviewField>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OverviewField {
    name: String,
    /// `:full` fields carry their header name in the value
    full: bool,
}

impl Default for OverviewFormat {
    /// The RFC 3977 §8.4 mandatory layout
    fn default() -> Self {
        Self::from_lines(&[
            "Subject:",
            "From:",
            "Date:",
            "Message-ID:",
            "References:",
            ":bytes",
            ":lines",
        ])
    }
}

impl OverviewFormat {
    /// Build from `LIST OVERVIEW.FMT` lines
    ///
    /// ```
    /// use nntp_reader::article::OverviewFormat;
    ///
    /// let format = OverviewFormat::from_lines(&["Subject:", "Bytes:", "Xref:full"]);
    /// assert_eq!(format.field_names(), vec!["subject", "bytes", "xref"]);
    /// ```
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let fields = lines
            .iter()
            .map(|l| l.as_ref().trim())
            .filter(|l| !l.is_empty())
            .map(|line| {
                let lower = line.to_ascii_lowercase();
                let (base, full) = match lower.strip_suffix(":full") {
                    Some(base) => (base.to_string(), true),
                    None => (lower, false),
                };
                OverviewField {
                    name: base.trim_matches(':').to_string(),
                    full,
                }
            })
            .collect();
        Self { fields }
    }

    /// Field names in row order, excluding the article number
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Split a tab-separated XOVER line into a raw row
    ///
    /// Missing trailing fields are simply absent from the row; extra
    /// trailing fields are ignored.
    pub fn parse_row(&self, line: &str) -> RawOverview {
        let mut columns = line.split('\t');
        let mut row = RawOverview::new();
        if let Some(number) = columns.next() {
            row.insert("number".to_string(), number.trim().to_string());
        }
        for (field, value) in self.fields.iter().zip(columns) {
            let value = if field.full {
                match value.split_once(':') {
                    Some((name, rest)) if name.eq_ignore_ascii_case(&field.name) => rest.trim(),
                    _ => value,
                }
            } else {
                value
            };
            row.insert(field.name.clone(), value.to_string());
        }
        row
    }
}
