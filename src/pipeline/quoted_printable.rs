//! Quoted-printable body decoding (RFC 2045 §6.7)

use super::Middleware;
use crate::article::Article;

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Decode quoted-printable text to bytes
///
/// `=XX` escapes become single bytes, soft line breaks (`=` before CRLF or
/// LF) are removed, and anything else (including a stray `=`) is copied
/// through.
///
/// ```
/// use nntp_reader::pipeline::quoted_printable::decode_bytes;
///
/// assert_eq!(decode_bytes("a=3Db=\r\nc"), b"a=bc");
/// assert_eq!(decode_bytes("100%=\n"), b"100%");
/// ```
pub fn decode_bytes(encoded: &str) -> Vec<u8> {
    let src = encoded.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'=' {
            out.push(src[i]);
            i += 1;
            continue;
        }
        let hi = src.get(i + 1).copied().and_then(hex_value);
        let lo = src.get(i + 2).copied().and_then(hex_value);
        if let (Some(hi), Some(lo)) = (hi, lo) {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        match (src.get(i + 1), src.get(i + 2)) {
            (Some(b'\r'), Some(b'\n')) => i += 3,
            (Some(b'\n'), _) => i += 2,
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    out
}

/// Decode quoted-printable text holding UTF-8
///
/// Contiguous escapes are decoded together, so multi-byte sequences such
/// as `=C3=A9` come back as one character. Invalid sequences become
/// U+FFFD.
pub fn decode_utf8(encoded: &str) -> String {
    String::from_utf8_lossy(&decode_bytes(encoded)).into_owned()
}

/// Decodes quoted-printable UTF-8 article bodies
///
/// Applies only when the transfer encoding is `quoted-printable` and the
/// charset is UTF-8. The content type is marked `8bit` afterwards, so
/// running the stage twice is harmless.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotedPrintable;

impl Middleware for QuotedPrintable {
    fn article(&self, article: &mut Article) {
        let Some(ct) = article.content_type.as_mut() else {
            return;
        };
        let applies = ct.transfer_encoding.as_deref() == Some("quoted-printable")
            && ct
                .charset
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case("utf-8"));
        if !applies {
            return;
        }
        article.body = decode_utf8(&article.body);
        ct.transfer_encoding = Some("8bit".to_string());
    }
}
