//! Content-Transfer-Encoding codecs for attachment payloads
//!
//! Attachments keep their wire representation until a caller asks for the
//! bytes. [`codec`] maps an encoding name to a decoder, or explains why the
//! encoding cannot be handled.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};

use crate::pipeline::quoted_printable;

/// A transfer-encoding decoder
pub trait Codec: Send + Sync {
    /// Canonical encoding name
    fn name(&self) -> &'static str;

    /// Estimated size of the decoded payload in bytes
    fn estimate_decoded_len(&self, encoded: &str) -> usize;

    /// Decode the wire text into bytes
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason if the payload is malformed.
    fn decode(&self, encoded: &str) -> std::result::Result<Vec<u8>, String>;
}

/// `base64` (RFC 2045 §6.8); line breaks and other whitespace are ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64;

impl Codec for Base64 {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn estimate_decoded_len(&self, encoded: &str) -> usize {
        (encoded.len() * 3).div_ceil(4)
    }

    fn decode(&self, encoded: &str) -> std::result::Result<Vec<u8>, String> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        BASE64
            .decode(compact.as_bytes())
            .map_err(|e| format!("Base64 decode error: {}", e))
    }
}

/// `8bit`, `7bit` and `binary`: every char below U+0100 is one byte
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    name: &'static str,
}

impl Codec for Identity {
    fn name(&self) -> &'static str {
        self.name
    }

    fn estimate_decoded_len(&self, encoded: &str) -> usize {
        encoded.chars().count()
    }

    fn decode(&self, encoded: &str) -> std::result::Result<Vec<u8>, String> {
        encoded
            .chars()
            .map(|c| u8::try_from(u32::from(c)).map_err(|_| format!("not a latin-1 character: {c:?}")))
            .collect()
    }
}

/// `quoted-printable` (RFC 2045 §6.7)
#[derive(Debug, Clone, Copy, Default)]
pub struct QuotedPrintable;

impl Codec for QuotedPrintable {
    fn name(&self) -> &'static str {
        "quoted-printable"
    }

    fn estimate_decoded_len(&self, encoded: &str) -> usize {
        encoded.len() - 2 * encoded.matches('=').count().min(encoded.len() / 3)
    }

    fn decode(&self, encoded: &str) -> std::result::Result<Vec<u8>, String> {
        Ok(quoted_printable::decode_bytes(encoded))
    }
}

static BASE64_CODEC: Base64 = Base64;
static EIGHT_BIT: Identity = Identity { name: "8bit" };
static SEVEN_BIT: Identity = Identity { name: "7bit" };
static BINARY: Identity = Identity { name: "binary" };
static QUOTED_PRINTABLE: QuotedPrintable = QuotedPrintable;

/// Look up a codec by `Content-Transfer-Encoding` name (case-insensitive)
///
/// Returns the reason string when the encoding is not supported; the caller
/// decides how severe that is.
///
/// ```
/// use nntp_reader::codec;
///
/// let c = codec("BASE64").unwrap();
/// assert_eq!(c.decode("aGk=").unwrap(), b"hi");
///
/// assert_eq!(
///     codec("x-uuencode").err().unwrap(),
///     "unsupported Content-Encoding: x-uuencode"
/// );
/// ```
pub fn codec(name: &str) -> std::result::Result<&'static dyn Codec, String> {
    let codec: &'static dyn Codec = match name.trim().to_ascii_lowercase().as_str() {
        "base64" => &BASE64_CODEC,
        "8bit" => &EIGHT_BIT,
        "7bit" => &SEVEN_BIT,
        "binary" => &BINARY,
        "quoted-printable" => &QUOTED_PRINTABLE,
        _ => return Err(format!("unsupported Content-Encoding: {}", name)),
    };
    Ok(codec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_ignores_crlf() {
        let c = codec("base64").unwrap();
        assert_eq!(c.decode("aGVs\r\nbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_base64_estimate() {
        let c = codec("base64").unwrap();
        assert_eq!(c.estimate_decoded_len("aGVsbG8="), 6);
    }

    #[test]
    fn test_base64_malformed() {
        let c = codec("base64").unwrap();
        assert!(c.decode("!!!").is_err());
    }

    #[test]
    fn test_eight_bit_latin1() {
        let c = codec("8bit").unwrap();
        assert_eq!(c.decode("caf\u{e9}").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(c.estimate_decoded_len("caf\u{e9}"), 4);
        assert!(c.decode("\u{20ac}").is_err());
    }

    #[test]
    fn test_quoted_printable_codec() {
        let c = codec("Quoted-Printable").unwrap();
        assert_eq!(c.name(), "quoted-printable");
        assert_eq!(c.decode("a=3Db").unwrap(), b"a=b");
    }

    #[test]
    fn test_unsupported() {
        assert_eq!(
            codec("uuencode").err().unwrap(),
            "unsupported Content-Encoding: uuencode"
        );
    }
}
