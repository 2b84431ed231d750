use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_RELATION: &str = "Visitor";

/// A guestbook signature left on an entry. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub relation: String,
    pub text: String,
    /// Milliseconds since the Unix epoch, assigned when the comment is built.
    pub created_at: i64,
}

/// Unvalidated guestbook input as it arrives from a form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentDraft {
    pub author: String,
    #[serde(default)]
    pub relation: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommentError {
    #[error("Your name is required to sign the guestbook")]
    MissingAuthor,
    #[error("A note is required to sign the guestbook")]
    MissingText,
}

impl CommentDraft {
    pub fn new(author: impl Into<String>, relation: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            relation: relation.map(str::to_string),
            text: text.into(),
        }
    }

    /// Validate and stamp the draft. Blank author or text is rejected so no
    /// write is ever issued for it.
    pub fn into_comment(self) -> Result<Comment, CommentError> {
        let author = self.author.trim();
        if author.is_empty() {
            return Err(CommentError::MissingAuthor);
        }
        let text = self.text.trim();
        if text.is_empty() {
            return Err(CommentError::MissingText);
        }
        let relation = self
            .relation
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RELATION);

        Ok(Comment {
            id: Uuid::new_v4().to_string(),
            author: author.to_string(),
            relation: relation.to_string(),
            text: text.to_string(),
            created_at: Utc::now().timestamp_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_defaults_to_visitor() {
        let comment = CommentDraft::new("Ana", None, "Lovely").into_comment().unwrap();
        assert_eq!(comment.relation, "Visitor");

        let comment = CommentDraft::new("Ana", Some("   "), "Lovely").into_comment().unwrap();
        assert_eq!(comment.relation, "Visitor");

        let comment = CommentDraft::new("Ana", Some("Granddaughter"), "Lovely")
            .into_comment()
            .unwrap();
        assert_eq!(comment.relation, "Granddaughter");
    }

    #[test]
    fn blank_author_or_text_is_rejected() {
        assert_eq!(
            CommentDraft::new("", None, "hi").into_comment(),
            Err(CommentError::MissingAuthor)
        );
        assert_eq!(
            CommentDraft::new("Ana", None, "  ").into_comment(),
            Err(CommentError::MissingText)
        );
    }

    #[test]
    fn ids_are_unique() {
        let a = CommentDraft::new("Ana", None, "one").into_comment().unwrap();
        let b = CommentDraft::new("Ana", None, "one").into_comment().unwrap();
        assert_ne!(a.id, b.id);
    }
}
