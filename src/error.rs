//! Reader error types

use std::time::Duration;

use nntp_rs::NntpError;
use thiserror::Error;

/// Errors surfaced by the reader engine
///
/// Remote failures (connection, missing group/article, timeout) are caught
/// at the [`NewsClient`](crate::NewsClient) boundary and handed back inside a
/// [`Wrapped`](crate::Wrapped) value. [`NewsError::UnknownOrigin`] is the one
/// condition returned directly to the caller: it means an alias was never
/// registered, which is a bug in the calling code rather than a server fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NewsError {
    /// Connecting or authenticating to the server failed
    #[error("Connection failed: {0}")]
    Connection(String),

    /// No such newsgroup
    #[error("No such newsgroup: {0}")]
    NoSuchGroup(String),

    /// No such article
    #[error("No such article: {0}")]
    NoSuchArticle(String),

    /// The deadline elapsed before the operation finished
    #[error("Timed out after {} ms", wait.as_millis())]
    Timeout {
        /// Configured wait duration
        wait: Duration,
    },

    /// Lookup of an alias that was never registered
    #[error("Unknown server alias: {0}")]
    UnknownOrigin(String),

    /// Any other protocol-level failure reported by the server
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A draft has blank required fields
    #[error("Invalid draft, empty fields: {}", empty.join(", "))]
    InvalidDraft {
        /// Names of the blank fields
        empty: Vec<String>,
    },

    /// The background task running the operation died
    #[error("Operation aborted: {0}")]
    Aborted(String),
}

impl NewsError {
    /// Stable machine-readable code for this error
    ///
    /// ```
    /// use nntp_reader::NewsError;
    /// use std::time::Duration;
    ///
    /// let err = NewsError::Timeout { wait: Duration::from_millis(7500) };
    /// assert_eq!(err.code(), "TIMEOUT");
    /// ```
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            NewsError::Connection(_) => "CONNECTION",
            NewsError::NoSuchGroup(_) => "NO_SUCH_GROUP",
            NewsError::NoSuchArticle(_) => "NO_SUCH_ARTICLE",
            NewsError::Timeout { .. } => "TIMEOUT",
            NewsError::UnknownOrigin(_) => "UNKNOWN_ORIGIN",
            NewsError::Protocol(_) => "PROTOCOL",
            NewsError::InvalidDraft { .. } => "INVALID_DRAFT",
            NewsError::Aborted(_) => "ABORTED",
        }
    }

    /// Whether this is the synthetic deadline error
    pub fn is_timeout(&self) -> bool {
        matches!(self, NewsError::Timeout { .. })
    }
}

impl From<NntpError> for NewsError {
    fn from(err: NntpError) -> Self {
        match err {
            NntpError::NoSuchGroup(group) => NewsError::NoSuchGroup(group),
            NntpError::NoSuchArticle(id) => NewsError::NoSuchArticle(id),
            NntpError::AuthFailed(message) => NewsError::Connection(message),
            NntpError::Tls(message) => NewsError::Connection(message),
            NntpError::Io(e) => NewsError::Connection(e.to_string()),
            NntpError::ConnectionClosed => NewsError::Connection("connection closed".to_string()),
            NntpError::EncryptionRequired(message) => NewsError::Connection(message),
            other => NewsError::Protocol(other.to_string()),
        }
    }
}

/// Result type alias using NewsError
pub type Result<T> = std::result::Result<T, NewsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(NewsError::Connection("x".into()).code(), "CONNECTION");
        assert_eq!(NewsError::NoSuchGroup("x".into()).code(), "NO_SUCH_GROUP");
        assert_eq!(NewsError::NoSuchArticle("x".into()).code(), "NO_SUCH_ARTICLE");
        assert_eq!(NewsError::UnknownOrigin("x".into()).code(), "UNKNOWN_ORIGIN");
    }

    #[test]
    fn test_timeout_display_carries_wait() {
        let err = NewsError::Timeout {
            wait: Duration::from_millis(7500),
        };
        assert_eq!(err.to_string(), "Timed out after 7500 ms");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_from_nntp_error() {
        let err: NewsError = NntpError::NoSuchGroup("alt.test".into()).into();
        assert_eq!(err, NewsError::NoSuchGroup("alt.test".into()));

        let err: NewsError = NntpError::AuthFailed("bad password".into()).into();
        assert_eq!(err, NewsError::Connection("bad password".into()));

        let err: NewsError = NntpError::Protocol {
            code: 502,
            message: "denied".into(),
        }
        .into();
        assert_eq!(err.code(), "PROTOCOL");
    }
}
