//! MIME multipart splitting (RFC 2046)

use std::collections::HashMap;

use tracing::{debug, warn};

use super::Middleware;
use crate::article::{Article, Attachment, ContentType, header_map, parse_content_type, split_params};

/// Splits a multipart body into a canonical text body plus attachments
///
/// Runs only when the article's content type carries a boundary. The
/// first `text/*` part without a `Content-Disposition` becomes the body
/// and its content type replaces the article's; `image/*` parts go to
/// `ext.img`; `application/*` parts and any further text parts go to
/// `ext.attach`. A `multipart/alternative` part is split with its own
/// boundary and contributes its `text/plain` version, else its
/// `text/html` one. Other types are logged and dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multipart;

impl Middleware for Multipart {
    fn article(&self, article: &mut Article) {
        let Some(boundary) = article
            .content_type
            .as_ref()
            .and_then(|ct| ct.boundary.clone())
        else {
            return;
        };

        let parts = split(&article.body, &boundary);
        if parts.is_empty() {
            debug!("No parts found for boundary {:?} in {}", boundary, article.id);
            return;
        }

        let mut canonical: Option<(String, ContentType)> = None;
        for part in &parts {
            let ct = part.content_type();
            if ct.is("text/") {
                if canonical.is_none() && !part.headers.contains_key("content-disposition") {
                    canonical = Some((part.lines.join("\n"), ct));
                } else {
                    article.ext.attach.push(part.attachment(ct));
                }
            } else if ct.is("image/") {
                article.ext.img.push(part.attachment(ct));
            } else if ct.is("application/") {
                article.ext.attach.push(part.attachment(ct));
            } else if ct.is("multipart/alternative") {
                let Some(choice) = alternative(part, &ct) else {
                    continue;
                };
                if canonical.is_none() {
                    canonical = Some(choice);
                } else {
                    debug!("Ignoring extra alternative part in {}", article.id);
                }
            } else {
                warn!("Dropping unsupported part {:?} in {}", ct.mime, article.id);
            }
        }

        match canonical {
            Some((body, ct)) => {
                article.body = body;
                article.content_type = Some(ct);
            }
            None => article.body.clear(),
        }
        article.ext.multipart = true;
    }
}

/// One body part: its headers and its raw lines
#[derive(Debug)]
struct Part<'a> {
    headers: HashMap<String, String>,
    lines: Vec<&'a str>,
}

impl Part<'_> {
    /// Part content type; RFC 2046 defaults to `text/plain`
    fn content_type(&self) -> ContentType {
        let encoding = self.headers.get("content-transfer-encoding").map(String::as_str);
        match self.headers.get("content-type") {
            Some(value) => parse_content_type(value, encoding),
            None => parse_content_type("text/plain", encoding),
        }
    }

    fn file_name(&self, ct: &ContentType) -> Option<String> {
        self.headers
            .get("content-disposition")
            .and_then(|d| split_params(d).1.remove("filename"))
            .filter(|n| !n.is_empty())
            .or_else(|| ct.name.clone())
    }

    fn attachment(&self, ct: ContentType) -> Attachment {
        Attachment {
            name: self.file_name(&ct),
            content_encoding: ct.transfer_encoding.clone().unwrap_or_else(|| "7bit".to_string()),
            content_type: ct.mime,
            data: self.lines.join("\r\n"),
        }
    }
}

/// Split `body` into parts at `--boundary` lines
///
/// The preamble before the first delimiter and the epilogue after the
/// closing `--boundary--` are discarded.
fn split<'a>(body: &'a str, boundary: &str) -> Vec<Part<'a>> {
    let delimiter = format!("--{boundary}");
    let mut parts = Vec::new();
    let mut current: Option<(Vec<&str>, Vec<&str>, bool)> = None;

    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix(delimiter.as_str()) {
            let rest = rest.trim_end();
            if rest.is_empty() || rest == "--" {
                if let Some((headers, lines, _)) = current.take() {
                    parts.push(Part {
                        headers: header_map(&headers),
                        lines,
                    });
                }
                if rest == "--" {
                    break;
                }
                current = Some((Vec::new(), Vec::new(), false));
                continue;
            }
        }
        if let Some((headers, lines, in_body)) = current.as_mut() {
            if *in_body {
                lines.push(line);
            } else if line.is_empty() {
                *in_body = true;
            } else {
                headers.push(line);
            }
        }
    }
    if let Some((headers, lines, _)) = current {
        parts.push(Part {
            headers: header_map(&headers),
            lines,
        });
    }
    parts
}

/// Pick the preferred version out of a `multipart/alternative` part
fn alternative(part: &Part<'_>, ct: &ContentType) -> Option<(String, ContentType)> {
    let raw = part.lines.join("\n");
    let Some(boundary) = ct.boundary.as_deref() else {
        warn!("multipart/alternative without boundary, using it raw");
        return Some((raw, parse_content_type("text/plain", None)));
    };
    let versions = split(&raw, boundary);
    if versions.is_empty() {
        warn!("Empty multipart/alternative");
        return None;
    }
    let typed: Vec<(ContentType, &Part<'_>)> =
        versions.iter().map(|p| (p.content_type(), p)).collect();
    for wanted in ["text/plain", "text/html"] {
        if let Some((ct, p)) = typed.iter().find(|(ct, _)| ct.mime == wanted) {
            return Some((p.lines.join("\n"), ct.clone()));
        }
    }
    debug!("No text version in multipart/alternative, using it raw");
    Some((raw, parse_content_type("text/plain", None)))
}
