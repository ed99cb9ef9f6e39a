//! RFC 2047 encoded-word decoding for headers

use std::sync::LazyLock;

use nntp_rs::encoded_words::decode_encoded_word;
use regex::Regex;

use super::Middleware;
use crate::article::{Article, Author, Overview};

static ENCODED_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"=\?[^?\s]+\?[BbQq]\?[^?\s]*\?=").expect("valid regex"));

/// Decodes `=?charset?B|Q?...?=` words in the author name and subject
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc2047;

/// Decode every encoded-word in `value`, leaving the text around them as is
///
/// Whitespace is dropped only between two adjacent encoded-words.
///
/// ```
/// use nntp_reader::pipeline::rfc2047::decode_words;
///
/// assert_eq!(decode_words("Caf\u{e9} =?UTF-8?B?SGVsbG8=?="), "Caf\u{e9} Hello");
/// assert_eq!(decode_words("=?UTF-8?Q?a?= =?UTF-8?Q?b?="), "ab");
/// ```
pub fn decode_words(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    let mut previous_word = false;
    for word in ENCODED_WORD.find_iter(value) {
        let between = &value[last..word.start()];
        if !(previous_word && between.chars().all(char::is_whitespace)) {
            out.push_str(between);
        }
        out.push_str(&decode_encoded_word(word.as_str()));
        last = word.end();
        previous_word = true;
    }
    out.push_str(&value[last..]);
    out
}

fn decode(value: &mut String) {
    if value.contains("=?") {
        *value = decode_words(value);
    }
}

fn decode_author(author: &mut Author) {
    decode(&mut author.name);
}

impl Middleware for Rfc2047 {
    fn overview(&self, overview: &mut Overview) {
        decode_author(&mut overview.from);
        decode(&mut overview.subject);
    }

    fn article(&self, article: &mut Article) {
        decode_author(&mut article.from);
        decode(&mut article.subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{article, overview};

    #[test]
    fn test_overview_name_and_subject() {
        let mut o = overview(
            "=?UTF-8?Q?Mar=C3=ADa_Garc=C3=ADa?=",
            "=?UTF-8?B?SGVsbG8=?= World",
        );
        Rfc2047.overview(&mut o);
        assert_eq!(o.from.name, "Mar\u{ed}a Garc\u{ed}a");
        assert_eq!(o.subject, "Hello World");
    }

    #[test]
    fn test_article_plain_untouched() {
        let mut a = article("=?UTF-8?B?SGVsbG8=?=", None);
        Rfc2047.article(&mut a);
        assert_eq!(a.subject, "hello");
        assert_eq!(a.from.name, "Jane");
        // body is not a header
        assert_eq!(a.body, "=?UTF-8?B?SGVsbG8=?=");
    }

    #[test]
    fn test_utf8_text_next_to_encoded_word() {
        let mut o = overview("J\u{f6}rg =?UTF-8?Q?M=C3=BCller?=", "Caf\u{e9} =?UTF-8?B?SGVsbG8=?=");
        Rfc2047.overview(&mut o);
        assert_eq!(o.from.name, "J\u{f6}rg M\u{fc}ller");
        assert_eq!(o.subject, "Caf\u{e9} Hello");
    }

    #[test]
    fn test_space_kept_between_word_and_text() {
        assert_eq!(decode_words("=?UTF-8?B?SGVsbG8=?= World"), "Hello World");
        assert_eq!(
            decode_words("=?UTF-8?B?SGVsbG8=?=  \t=?UTF-8?B?V29ybGQ=?= !"),
            "HelloWorld !"
        );
    }

    #[test]
    fn test_malformed_word_passes_through() {
        let mut o = overview("Jane", "=?broken");
        Rfc2047.overview(&mut o);
        assert_eq!(o.subject, "=?broken");
    }
}
