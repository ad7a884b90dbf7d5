use anyhow::Context;
use chrono::Utc;
use tracing::{debug, info};

use crate::db::KeyValueStore;
use crate::error::{QuoteError, Result};
use crate::models::{MergeSummary, Quote, default_quotes, validate_quote_input};

/// Durable key holding the JSON array of quotes.
pub const QUOTES_KEY: &str = "quotes";

/// Ordered list of quotes mirrored to durable storage after every mutation.
pub struct QuoteStore<S: KeyValueStore> {
    storage: S,
    quotes: Vec<Quote>,
}

impl<S: KeyValueStore> QuoteStore<S> {
    /// Load saved quotes, falling back to the built-in seeds when nothing has
    /// been saved yet. Seeds are not written until the first mutation.
    pub fn load(storage: S) -> Result<Self> {
        let saved = Self::read_saved(&storage)?;
        let quotes = saved.unwrap_or_else(|| {
            debug!("no saved quotes, starting from seeds");
            default_quotes()
        });
        Ok(Self { storage, quotes })
    }

    /// Load saved quotes, starting empty when nothing has been saved.
    pub fn load_empty(storage: S) -> Result<Self> {
        let quotes = Self::read_saved(&storage)?.unwrap_or_default();
        Ok(Self { storage, quotes })
    }

    fn read_saved(storage: &S) -> Result<Option<Vec<Quote>>> {
        let Some(raw) = storage.get(QUOTES_KEY)? else {
            return Ok(None);
        };
        let quotes: Vec<Quote> = serde_json::from_str(&raw)
            .context("Saved quotes are not a valid JSON array of quotes")?;
        debug!(count = quotes.len(), "loaded saved quotes");
        Ok(Some(quotes))
    }

    #[must_use]
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Validate and append a new quote, then persist.
    ///
    /// The returned record is the one to push to the remote endpoint.
    pub fn add(&mut self, text: &str, category: &str) -> Result<Quote> {
        let (text, category) = validate_quote_input(text, category)?;
        let now = Utc::now().timestamp_millis();
        let quote = Quote::new(self.next_id(now)?, text, category, now);
        self.quotes.push(quote.clone());
        self.persist()?;
        info!(id = ?quote.id, category = %quote.category, "added quote");
        Ok(quote)
    }

    /// Ids follow the creation clock but never repeat or go backwards.
    fn next_id(&self, now: i64) -> Result<i64> {
        match self.quotes.iter().filter_map(|q| q.id).max() {
            Some(max) if max >= now => max.checked_add(1).ok_or_else(|| {
                QuoteError::Validation("No quote ids left above the highest stored id.".to_string())
            }),
            _ => Ok(now),
        }
    }

    /// Append every record as-is. No validation, no deduplication.
    pub fn import_many(&mut self, records: Vec<Quote>) -> Result<usize> {
        let count = records.len();
        self.quotes.extend(records);
        self.persist()?;
        info!(count, "imported quotes");
        Ok(count)
    }

    /// Pretty-printed JSON array of the whole store.
    pub fn export_all(&self) -> Result<String> {
        let json =
            serde_json::to_string_pretty(&self.quotes).context("Failed to serialize quotes")?;
        Ok(json)
    }

    pub fn persist(&self) -> Result<()> {
        let json = serde_json::to_string(&self.quotes).context("Failed to serialize quotes")?;
        self.storage.set(QUOTES_KEY, &json)?;
        debug!(count = self.quotes.len(), "persisted quotes");
        Ok(())
    }

    /// Reconcile a remote batch by id using last-write-wins, then persist.
    ///
    /// Unknown or id-less records are appended. A matched record is
    /// overwritten field by field, keeping its position, only when the remote
    /// copy is strictly newer.
    pub fn merge_remote(&mut self, remote: Vec<Quote>) -> Result<MergeSummary> {
        let mut summary = MergeSummary::default();

        for incoming in remote {
            let existing = incoming
                .id
                .and_then(|id| self.quotes.iter_mut().find(|q| q.id == Some(id)));

            match existing {
                None => {
                    self.quotes.push(incoming);
                    summary.added += 1;
                }
                Some(local) if incoming.is_newer_than(local) => {
                    local.text = incoming.text;
                    local.category = incoming.category;
                    local.updated_at = incoming.updated_at;
                    summary.updated += 1;
                }
                Some(_) => summary.unchanged += 1,
            }
        }

        self.persist()?;
        info!(
            added = summary.added,
            updated = summary.updated,
            unchanged = summary.unchanged,
            "merged remote quotes"
        );
        Ok(summary)
    }
}

/// Parse the contents of an import file into records.
///
/// The payload must be a JSON array; its elements are taken as quotes
/// without further checks.
pub fn parse_import(contents: &str) -> Result<Vec<Quote>> {
    let value: serde_json::Value = serde_json::from_str(contents)
        .map_err(|e| QuoteError::MalformedImport(format!("not valid JSON ({e})")))?;
    let serde_json::Value::Array(entries) = value else {
        return Err(QuoteError::MalformedImport(
            "expected a JSON array of quotes".to_string(),
        ));
    };
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry).map_err(|e| {
                let reason = format!("unreadable quote entry at index {index} ({e})");
                QuoteError::MalformedImport(reason)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn quote(id: i64, text: &str, updated_at: i64) -> Quote {
        Quote::new(id, text.to_string(), "General".to_string(), updated_at)
    }

    fn empty_store() -> QuoteStore<Database> {
        QuoteStore::load_empty(Database::open_in_memory().unwrap()).unwrap()
    }

    fn saved_quotes(store: &QuoteStore<Database>) -> Vec<Quote> {
        let raw = store.storage().get(QUOTES_KEY).unwrap().unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn test_load_seeds_when_nothing_saved() {
        let store = QuoteStore::load(Database::open_in_memory().unwrap()).unwrap();
        assert_eq!(store.len(), 4);
        // Seeds are not written until something changes
        assert!(store.storage().get(QUOTES_KEY).unwrap().is_none());
    }

    #[test]
    fn test_load_prefers_saved_quotes() {
        let db = Database::open_in_memory().unwrap();
        db.set(QUOTES_KEY, r#"[{"id":1,"text":"Saved","category":"Mine","updatedAt":5}]"#)
            .unwrap();
        let store = QuoteStore::load(db).unwrap();
        assert_eq!(store.quotes(), &[Quote::new(1, "Saved".into(), "Mine".into(), 5)]);
    }

    #[test]
    fn test_load_saved_empty_array_does_not_reseed() {
        let db = Database::open_in_memory().unwrap();
        db.set(QUOTES_KEY, "[]").unwrap();
        let store = QuoteStore::load(db).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupt_storage_is_error() {
        let db = Database::open_in_memory().unwrap();
        db.set(QUOTES_KEY, "{not json").unwrap();
        let err = QuoteStore::load(db).err().unwrap();
        assert!(err.is_storage());
    }

    #[test]
    fn test_add_appends_and_persists() {
        let mut store = empty_store();
        let added = store.add("  Keep going.  ", " Motivation ").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(added.text, "Keep going.");
        assert_eq!(added.category, "Motivation");
        assert!(added.id.is_some());
        assert_eq!(added.id, added.updated_at);
        assert_eq!(saved_quotes(&store), vec![added]);
    }

    #[test]
    fn test_add_rejects_empty_fields() {
        let mut store = empty_store();
        store.add("kept", "x").unwrap();

        assert!(matches!(store.add("", "x"), Err(QuoteError::Validation(_))));
        assert!(matches!(store.add("x", ""), Err(QuoteError::Validation(_))));
        assert!(matches!(store.add("x", "   "), Err(QuoteError::Validation(_))));
        assert_eq!(store.len(), 1);
        assert_eq!(saved_quotes(&store).len(), 1);
    }

    #[test]
    fn test_add_ids_are_unique_and_increasing() {
        let mut store = empty_store();
        let ids: Vec<i64> = (0..5)
            .map(|i| store.add(&format!("quote {i}"), "Rapid").unwrap().id.unwrap())
            .collect();
        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_next_id_skips_past_future_ids() {
        let mut store = empty_store();
        let far_future = Utc::now().timestamp_millis() + 1_000_000;
        store
            .import_many(vec![quote(far_future, "from the future", 1)])
            .unwrap();
        let added = store.add("now", "Time").unwrap();
        assert_eq!(added.id, Some(far_future + 1));
    }

    #[test]
    fn test_add_after_max_id_is_rejected() {
        let mut store = empty_store();
        let records =
            parse_import(r#"[{"id":9223372036854775807,"text":"t","category":"c"}]"#).unwrap();
        store.import_many(records).unwrap();

        let err = store.add("new", "c").unwrap_err();
        assert!(matches!(err, QuoteError::Validation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_import_many_appends_without_dedup() {
        let mut store = empty_store();
        let batch = vec![quote(1, "A", 10), quote(1, "A", 10)];
        assert_eq!(store.import_many(batch.clone()).unwrap(), 2);
        assert_eq!(store.import_many(batch).unwrap(), 2);
        assert_eq!(store.len(), 4);
        assert_eq!(saved_quotes(&store).len(), 4);
    }

    #[test]
    fn test_export_then_import_reproduces_store() {
        let mut source = empty_store();
        source.add("First", "One").unwrap();
        source
            .import_many(vec![Quote {
                id: None,
                text: "Legacy".into(),
                category: "Old".into(),
                updated_at: None,
            }])
            .unwrap();

        let exported = source.export_all().unwrap();
        assert!(exported.contains('\n'), "export should be pretty-printed");

        let mut target = empty_store();
        target.import_many(parse_import(&exported).unwrap()).unwrap();
        assert_eq!(target.quotes(), source.quotes());
    }

    #[test]
    fn test_parse_import_rejects_invalid_json() {
        assert!(matches!(
            parse_import("not json"),
            Err(QuoteError::MalformedImport(_))
        ));
    }

    #[test]
    fn test_parse_import_rejects_non_array() {
        assert!(matches!(
            parse_import(r#"{"text":"A","category":"B"}"#),
            Err(QuoteError::MalformedImport(_))
        ));
    }

    #[test]
    fn test_parse_import_names_bad_entry() {
        let err = parse_import(r#"[{"text":"ok","category":"c"},{"id":"x"}]"#).unwrap_err();
        assert!(err.to_string().contains("index 1"), "{err}");

        let err = parse_import("[1]").unwrap_err();
        assert!(err.to_string().contains("index 0"), "{err}");
    }

    #[test]
    fn test_parse_import_accepts_loose_entries() {
        let parsed = parse_import(r#"[{"text":"only text"},{"category":"only cat","extra":1}]"#)
            .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].category, "");
        assert_eq!(parsed[1].text, "");
    }

    #[test]
    fn test_merge_newer_remote_overwrites_in_place() {
        let mut store = empty_store();
        store
            .import_many(vec![quote(5, "before", 1), quote(1, "A", 100)])
            .unwrap();

        let summary = store.merge_remote(vec![quote(1, "B", 200)]).unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.quotes()[1].text, "B");
        assert_eq!(store.quotes()[1].updated_at, Some(200));
        assert_eq!(store.quotes()[0].text, "before");
        assert_eq!(saved_quotes(&store)[1].text, "B");
    }

    #[test]
    fn test_merge_older_or_equal_remote_is_ignored() {
        let mut store = empty_store();
        store.import_many(vec![quote(1, "A", 100)]).unwrap();

        let summary = store
            .merge_remote(vec![quote(1, "Old", 50), quote(1, "Same", 100)])
            .unwrap();

        assert_eq!(summary.unchanged, 2);
        assert_eq!(store.quotes(), &[quote(1, "A", 100)]);
    }

    #[test]
    fn test_merge_unknown_id_is_appended() {
        let mut store = empty_store();
        store.import_many(vec![quote(1, "A", 100)]).unwrap();

        let summary = store.merge_remote(vec![quote(99, "New", 1)]).unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(store.len(), 2);
        assert_eq!(store.quotes()[1].id, Some(99));
    }

    #[test]
    fn test_merge_never_matches_missing_ids() {
        let mut store = empty_store();
        let legacy = Quote {
            id: None,
            text: "Legacy".into(),
            category: "Old".into(),
            updated_at: Some(1),
        };
        store.import_many(vec![legacy.clone()]).unwrap();

        let summary = store.merge_remote(vec![legacy]).unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_merge_remote_timestamp_beats_missing_local_timestamp() {
        let mut store = empty_store();
        store
            .import_many(vec![Quote {
                id: Some(3),
                text: "untimed".into(),
                category: "c".into(),
                updated_at: None,
            }])
            .unwrap();

        store.merge_remote(vec![quote(3, "timed", 1)]).unwrap();
        assert_eq!(store.quotes()[0].text, "timed");
    }
}
