//! Repair of Windows-1252 text that was read as ISO-8859-1
//!
//! Servers and clients that label Windows-1252 text as Latin-1 leave C1
//! control characters (U+0080 to U+009F) where curly quotes, dashes and
//! the euro sign should be. Those code points are remapped through the
//! Windows-1252 table.

use encoding_rs::WINDOWS_1252;

use super::Middleware;
use crate::article::{Article, Overview};

fn is_c1(c: char) -> bool {
    ('\u{80}'..='\u{9f}').contains(&c)
}

/// Remap C1 control characters to their Windows-1252 meaning
///
/// ```
/// use nntp_reader::pipeline::windows1252::patch;
///
/// assert_eq!(patch("\u{93}quoted\u{94} \u{80}5"), "\u{201c}quoted\u{201d} \u{20ac}5");
/// assert_eq!(patch("plain"), "plain");
/// ```
pub fn patch(text: &str) -> String {
    if !text.chars().any(is_c1) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_c1(c) {
            // c is below 0xA0, so the byte cast is lossless
            let byte = [c as u8];
            let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(&byte);
            out.push_str(&decoded);
        } else {
            out.push(c);
        }
    }
    out
}

fn patch_in_place(value: &mut String) {
    if value.chars().any(is_c1) {
        *value = patch(value);
    }
}

/// Applies [`patch`] to author names, subjects and article bodies
#[derive(Debug, Clone, Copy, Default)]
pub struct Windows1252;

impl Middleware for Windows1252 {
    fn overview(&self, overview: &mut Overview) {
        patch_in_place(&mut overview.from.name);
        patch_in_place(&mut overview.subject);
    }

    fn article(&self, article: &mut Article) {
        patch_in_place(&mut article.from.name);
        patch_in_place(&mut article.subject);
        patch_in_place(&mut article.body);
    }
}
