use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Category, Comment};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub user_id: String,
    pub text: String,
    /// Calendar day as `YYYY-MM-DD`.
    pub date: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub ai_prompted: bool,
    pub created_at: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Fields supplied when creating an entry. Id, owner and creation time are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub text: String,
    pub date: String,
    pub category: Category,
    pub image_url: Option<String>,
    pub ai_prompted: bool,
}

impl NewEntry {
    /// Field errors keyed by form field name; empty when the entry is valid.
    pub fn validate(&self) -> HashMap<String, String> {
        let mut errors = HashMap::new();

        if self.text.trim().is_empty() {
            errors.insert("text".to_string(), "Write something to remember".to_string());
        }

        if NaiveDate::parse_from_str(&self.date, DATE_FORMAT).is_err() {
            errors.insert("date".to_string(), "Date must be YYYY-MM-DD".to_string());
        }

        if let Some(url) = &self.image_url {
            if !url.starts_with("http://")
                && !url.starts_with("https://")
                && !url.starts_with("data:image/")
            {
                errors.insert(
                    "image_url".to_string(),
                    "Image must be an http(s) or data:image URL".to_string(),
                );
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_entry() -> NewEntry {
        NewEntry {
            text: "Paris trip".to_string(),
            date: "2024-01-01".to_string(),
            category: Category::Travel,
            image_url: None,
            ai_prompted: false,
        }
    }

    #[test]
    fn valid_entry_has_no_errors() {
        assert!(new_entry().validate().is_empty());
    }

    #[test]
    fn blank_text_and_bad_date_are_reported() {
        let entry = NewEntry {
            text: "   ".to_string(),
            date: "01/02/2024".to_string(),
            ..new_entry()
        };
        let errors = entry.validate();
        assert!(errors.contains_key("text"));
        assert!(errors.contains_key("date"));
    }

    #[test]
    fn image_reference_must_be_a_url() {
        let entry = NewEntry {
            image_url: Some("ftp://example.com/a.png".to_string()),
            ..new_entry()
        };
        assert!(entry.validate().contains_key("image_url"));

        let entry = NewEntry {
            image_url: Some("data:image/png;base64,AAAA".to_string()),
            ..new_entry()
        };
        assert!(entry.validate().is_empty());
    }
}
