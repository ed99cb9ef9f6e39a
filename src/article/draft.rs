//! Outgoing articles

use nntp_rs::ArticleBuilder;

use super::types::{ArticleId, Author};
use crate::error::{NewsError, Result};

/// An article composed by the user, ready for POST
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    /// Target newsgroup
    pub newsgroup: String,
    /// Author
    pub from: Author,
    /// Subject line
    pub subject: String,
    /// Message-IDs being replied to, oldest first
    pub references: Vec<ArticleId>,
    /// Body text; any line ending style
    pub body: String,
}

impl Draft {
    /// Check that every required field is filled in
    ///
    /// # Errors
    ///
    /// Returns [`NewsError::InvalidDraft`] listing the blank fields.
    ///
    /// ```
    /// use nntp_reader::{Author, Draft};
    ///
    /// let draft = Draft {
    ///     newsgroup: "alt.test".into(),
    ///     from: Author { name: "Jane".into(), email: "jane@example.com".into() },
    ///     subject: "hello".into(),
    ///     body: "  ".into(),
    ///     ..Default::default()
    /// };
    /// let err = draft.validate().unwrap_err();
    /// assert_eq!(err.code(), "INVALID_DRAFT");
    /// ```
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("group", self.newsgroup.as_str()),
            ("name", self.from.name.as_str()),
            ("email", self.from.email.as_str()),
            ("subject", self.subject.as_str()),
            ("body", self.body.as_str()),
        ];
        let empty: Vec<String> = checks
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(field, _)| field.to_string())
            .collect();
        if empty.is_empty() {
            Ok(())
        } else {
            Err(NewsError::InvalidDraft { empty })
        }
    }

    /// Body with trailing whitespace removed and CRLF line endings
    pub fn wire_body(&self) -> String {
        self.body
            .trim_end()
            .lines()
            .collect::<Vec<_>>()
            .join("\r\n")
    }

    /// `From` header value
    pub fn from_header(&self) -> String {
        format!("{} <{}>", self.from.name.trim(), self.from.email.trim())
    }

    /// Wire article builder for this draft
    pub fn builder(&self, user_agent: &str) -> ArticleBuilder {
        let mut builder = ArticleBuilder::new()
            .from(self.from_header())
            .subject(self.subject.trim())
            .add_newsgroup(self.newsgroup.trim())
            .user_agent(user_agent)
            .body(self.wire_body());
        if !self.references.is_empty() {
            builder = builder.references(self.references.clone());
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> Draft {
        Draft {
            newsgroup: "alt.test".into(),
            from: Author {
                name: "Jane".into(),
                email: "jane@example.com".into(),
            },
            subject: "hello".into(),
            references: vec!["<a@b>".into()],
            body: "line one\nline two\n\n".into(),
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_lists_empty_fields() {
        let d = Draft {
            subject: String::new(),
            body: " \n".into(),
            ..draft()
        };
        match d.validate() {
            Err(NewsError::InvalidDraft { empty }) => assert_eq!(empty, vec!["subject", "body"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_wire_body() {
        assert_eq!(draft().wire_body(), "line one\r\nline two");
    }

    #[test]
    fn test_from_header() {
        assert_eq!(draft().from_header(), "Jane <jane@example.com>");
    }

    #[test]
    fn test_builder_builds() {
        let article = draft().builder("test/1.0").build().unwrap();
        assert_eq!(article.headers.subject, "hello");
        assert_eq!(article.headers.newsgroups, vec!["alt.test"]);
        assert_eq!(article.headers.user_agent.as_deref(), Some("test/1.0"));
    }
}
