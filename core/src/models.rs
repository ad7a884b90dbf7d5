use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, Result};

/// Category value meaning "no filter".
pub const ALL_CATEGORIES: &str = "all";

pub const NO_QUOTES_MESSAGE: &str = "No quotes available. Add one below!";
pub const MISSING_INPUT_MESSAGE: &str = "Please enter both a quote and a category.";

/// Default lifetime of a transient notification.
pub const DEFAULT_NOTIFICATION_MS: u64 = 3000;

/// File name used when exporting the store.
pub const EXPORT_FILE_NAME: &str = "quotes.json";

/// A single quote record.
///
/// `id` and `updated_at` are optional: records written by earlier versions
/// (and the built-in seeds) carry neither. Absent fields are skipped on
/// serialization so exported files reproduce the input exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Quote {
    #[must_use]
    pub fn new(id: i64, text: String, category: String, updated_at: i64) -> Self {
        Self {
            id: Some(id),
            text,
            category,
            updated_at: Some(updated_at),
        }
    }

    /// Last-write-wins check: `self` replaces `local` only with a strictly newer
    /// timestamp. A missing timestamp is older than any present one.
    #[must_use]
    pub fn is_newer_than(&self, local: &Quote) -> bool {
        self.updated_at > local.updated_at
    }
}

/// Quotes the store starts from when nothing has been saved yet.
#[must_use]
pub fn default_quotes() -> Vec<Quote> {
    [
        (
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        ("Your limitation\u{2014}it's only your imagination.", "Inspiration"),
        (
            "Push yourself, because no one else is going to do it for you.",
            "Motivation",
        ),
        ("Success is not in what you have, but who you are.", "Wisdom"),
    ]
    .into_iter()
    .map(|(text, category)| Quote {
        id: None,
        text: text.to_string(),
        category: category.to_string(),
        updated_at: None,
    })
    .collect()
}

/// Trim and check user input for a new quote.
pub fn validate_quote_input(text: &str, category: &str) -> Result<(String, String)> {
    let text = text.trim();
    let category = category.trim();
    if text.is_empty() || category.is_empty() {
        return Err(QuoteError::Validation(MISSING_INPUT_MESSAGE.to_string()));
    }
    Ok((text.to_string(), category.to_string()))
}

/// What the quote region currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QuoteDisplay {
    Quote { quote: Quote },
    Empty { message: String },
}

impl QuoteDisplay {
    #[must_use]
    pub fn empty() -> Self {
        Self::Empty {
            message: NO_QUOTES_MESSAGE.to_string(),
        }
    }

    #[must_use]
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Quote { quote } => Some(quote),
            Self::Empty { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// Transient message for the notification region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub hide_after_ms: u64,
}

impl Notification {
    #[must_use]
    pub fn new(level: NotificationLevel, message: impl Into<String>, hide_after_ms: u64) -> Self {
        Self {
            message: message.into(),
            level,
            hide_after_ms,
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>, hide_after_ms: u64) -> Self {
        Self::new(NotificationLevel::Info, message, hide_after_ms)
    }

    #[must_use]
    pub fn success(message: impl Into<String>, hide_after_ms: u64) -> Self {
        Self::new(NotificationLevel::Success, message, hide_after_ms)
    }

    #[must_use]
    pub fn error(message: impl Into<String>, hide_after_ms: u64) -> Self {
        Self::new(NotificationLevel::Error, message, hide_after_ms)
    }
}

/// Result of reconciling a remote batch into the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_quote_input_trims() {
        let (text, category) = validate_quote_input("  Stay hungry. ", "\tWisdom\n").unwrap();
        assert_eq!(text, "Stay hungry.");
        assert_eq!(category, "Wisdom");
    }

    #[test]
    fn test_validate_quote_input_rejects_blank() {
        assert!(matches!(
            validate_quote_input("", "x"),
            Err(QuoteError::Validation(_))
        ));
        assert!(matches!(
            validate_quote_input("x", ""),
            Err(QuoteError::Validation(_))
        ));
        assert!(matches!(
            validate_quote_input("   ", "x"),
            Err(QuoteError::Validation(_))
        ));
    }

    #[test]
    fn test_quote_json_field_names() {
        let quote = Quote::new(7, "Hi".to_string(), "Greeting".to_string(), 1234);
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["text"], "Hi");
        assert_eq!(json["category"], "Greeting");
        assert_eq!(json["updatedAt"], 1234);
    }

    #[test]
    fn test_legacy_quote_omits_missing_fields() {
        let quote: Quote =
            serde_json::from_str(r#"{"text":"Old","category":"Legacy"}"#).unwrap();
        assert!(quote.id.is_none());
        assert!(quote.updated_at.is_none());
        let json = serde_json::to_string(&quote).unwrap();
        assert_eq!(json, r#"{"text":"Old","category":"Legacy"}"#);
    }

    #[test]
    fn test_is_newer_than() {
        let older = Quote::new(1, "A".into(), "c".into(), 100);
        let newer = Quote::new(1, "B".into(), "c".into(), 200);
        assert!(newer.is_newer_than(&older));
        assert!(!older.is_newer_than(&newer));
        assert!(!older.is_newer_than(&older.clone()));

        // Missing timestamps sort before present ones
        let mut untimed = older.clone();
        untimed.updated_at = None;
        assert!(older.is_newer_than(&untimed));
        assert!(!untimed.is_newer_than(&older));
        assert!(!untimed.is_newer_than(&untimed.clone()));
    }

    #[test]
    fn test_default_quotes_are_legacy_shaped() {
        let seeds = default_quotes();
        assert_eq!(seeds.len(), 4);
        assert!(seeds.iter().all(|q| q.id.is_none() && q.updated_at.is_none()));
    }

    #[test]
    fn test_display_serializes_state_tag() {
        let json = serde_json::to_value(QuoteDisplay::empty()).unwrap();
        assert_eq!(json["state"], "empty");
        assert_eq!(json["message"], NO_QUOTES_MESSAGE);
    }
}
