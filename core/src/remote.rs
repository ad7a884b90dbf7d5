use std::future::Future;

use anyhow::Result;
use serde::Deserialize;

use crate::models::Quote;

/// Category given to remote entries that arrive without one.
pub const SERVER_CATEGORY: &str = "Server";

/// Remote endpoint the sync agent talks to.
///
/// The CLI implements this with reqwest; tests use a fake returning fixed
/// records.
pub trait RemoteQuotes: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Quote>>> + Send;
    fn push(&self, quote: &Quote) -> impl Future<Output = Result<()>> + Send;
}

/// One entry of a remote payload.
///
/// Accepts both quote-shaped entries and placeholder posts
/// (`title`/`body`); other fields such as `userId` are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    pub id: Option<i64>,
    pub text: Option<String>,
    pub category: Option<String>,
    pub updated_at: Option<i64>,
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Adapt a remote entry into a quote, or `None` when it carries no text.
///
/// Entries without their own timestamp are stamped with `fetched_at`.
#[must_use]
pub fn record_to_quote(record: RemoteRecord, fetched_at: i64) -> Option<Quote> {
    let text = record
        .text
        .filter(|t| !t.trim().is_empty())
        .or_else(|| record.title.filter(|t| !t.trim().is_empty()))
        .or_else(|| record.body.filter(|b| !b.trim().is_empty()))?;

    let category = record
        .category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| SERVER_CATEGORY.to_string());

    Some(Quote {
        id: record.id,
        text,
        category,
        updated_at: Some(record.updated_at.unwrap_or(fetched_at)),
    })
}

#[cfg(test)]
pub(crate) mod fake {
    use std::sync::Mutex;

    use anyhow::{Result, bail};

    use super::RemoteQuotes;
    use crate::models::Quote;

    /// In-memory remote with scripted fetch results.
    #[derive(Default)]
    pub(crate) struct FakeRemote {
        pub(crate) records: Mutex<Vec<Quote>>,
        pub(crate) pushed: Mutex<Vec<Quote>>,
        pub(crate) fail_fetch: bool,
        pub(crate) fail_push: bool,
    }

    impl FakeRemote {
        pub(crate) fn with_records(records: Vec<Quote>) -> Self {
            Self {
                records: Mutex::new(records),
                ..Self::default()
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                fail_fetch: true,
                fail_push: true,
                ..Self::default()
            }
        }

        pub(crate) fn pushed(&self) -> Vec<Quote> {
            self.pushed.lock().unwrap().clone()
        }
    }

    impl RemoteQuotes for FakeRemote {
        async fn fetch(&self) -> Result<Vec<Quote>> {
            if self.fail_fetch {
                bail!("connection refused");
            }
            Ok(self.records.lock().unwrap().clone())
        }

        async fn push(&self, quote: &Quote) -> Result<()> {
            if self.fail_push {
                bail!("server responded with 500 Internal Server Error");
            }
            self.pushed.lock().unwrap().push(quote.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_shaped_record() {
        let record: RemoteRecord = serde_json::from_str(
            r#"{"id":4,"text":"Hello","category":"Greeting","updatedAt":900}"#,
        )
        .unwrap();
        let quote = record_to_quote(record, 1).unwrap();
        assert_eq!(quote, Quote::new(4, "Hello".into(), "Greeting".into(), 900));
    }

    #[test]
    fn test_post_shaped_record() {
        let record: RemoteRecord = serde_json::from_str(
            r#"{"userId":1,"id":3,"title":"ea molestias quasi","body":"et iusto sed"}"#,
        )
        .unwrap();
        let quote = record_to_quote(record, 5000).unwrap();
        assert_eq!(quote.id, Some(3));
        assert_eq!(quote.text, "ea molestias quasi");
        assert_eq!(quote.category, SERVER_CATEGORY);
        assert_eq!(quote.updated_at, Some(5000));
    }

    #[test]
    fn test_body_used_when_title_blank() {
        let record = RemoteRecord {
            id: Some(1),
            title: Some("  ".into()),
            body: Some("from body".into()),
            ..RemoteRecord::default()
        };
        assert_eq!(record_to_quote(record, 0).unwrap().text, "from body");
    }

    #[test]
    fn test_record_without_text_is_dropped() {
        let record = RemoteRecord {
            id: Some(1),
            category: Some("Empty".into()),
            ..RemoteRecord::default()
        };
        assert!(record_to_quote(record, 0).is_none());
    }
}
