//! Signature block splitting

use super::Middleware;
use crate::article::Article;

const MARKER: &str = "\n-- \n";

/// Moves the signature (from the `-- ` line on) into `ext.sig`
///
/// A marker at the very start of the body is not a signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signature;

impl Middleware for Signature {
    fn article(&self, article: &mut Article) {
        let Some(idx) = article.body.find(MARKER) else {
            return;
        };
        if idx == 0 {
            return;
        }
        article.ext.sig = Some(article.body[idx + 1..].to_string());
        article.body.truncate(idx);
    }
}
