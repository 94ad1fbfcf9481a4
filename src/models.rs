//! Data models for the pipeline.
//!
//! This module contains the artifacts passed between stages: the
//! identifier list, the item table, and the word-frequency ranking,
//! plus the run summary used for reporting.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Numeric item identifier assigned by the news service.
pub type ItemId = u64;

/// Ranked identifiers, in the order the service returned them.
pub type IdentifierList = Vec<ItemId>;

/// One fetched item: an open-ended mapping of field name to value.
pub type ItemRecord = Map<String, Value>;

/// Field holding the headline text.
pub const TITLE_FIELD: &str = "title";

/// Which stage(s) of the pipeline to run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Fetch ids, fetch items, analyze titles (default)
    #[default]
    All,
    /// Only fetch the top-story identifiers
    Ids,
    /// Only fetch item details for the stored identifiers
    Items,
    /// Only analyze the stored item table
    Words,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::All => write!(f, "all"),
            Stage::Ids => write!(f, "ids"),
            Stage::Items => write!(f, "items"),
            Stage::Words => write!(f, "words"),
        }
    }
}

impl Stage {
    pub fn runs_ids(&self) -> bool {
        matches!(self, Stage::All | Stage::Ids)
    }

    pub fn runs_items(&self) -> bool {
        matches!(self, Stage::All | Stage::Items)
    }

    pub fn runs_words(&self) -> bool {
        matches!(self, Stage::All | Stage::Words)
    }
}

/// What the aggregator does when a single item fetch fails.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ItemErrorPolicy {
    /// Abort the whole stage on the first failure
    #[default]
    Abort,
    /// Record the failure and keep going
    Skip,
}

/// An item fetch that failed while the skip policy was active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub id: ItemId,
    pub message: String,
}

/// Ordered rows of item records with the union of their columns.
///
/// Columns appear in the order they were first encountered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemTable {
    columns: Vec<String>,
    rows: Vec<ItemRecord>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row, extending the column set with any new fields.
    pub fn push(&mut self, record: ItemRecord) {
        for key in record.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[ItemRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Titles of every row that has a textual title, in row order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .filter_map(|row| row.get(TITLE_FIELD).and_then(Value::as_str))
    }

    /// The first `n` rows, for monitoring output.
    pub fn preview(&self, n: usize) -> &[ItemRecord] {
        &self.rows[..n.min(self.rows.len())]
    }
}

impl FromIterator<ItemRecord> for ItemTable {
    fn from_iter<I: IntoIterator<Item = ItemRecord>>(iter: I) -> Self {
        let mut table = ItemTable::new();
        for record in iter {
            table.push(record);
        }
        table
    }
}

/// A single ranked word and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: u64,
}

/// Ranked word counts, highest count first.
///
/// Serialized as a JSON object whose key order is the rank order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordFrequencyMap {
    entries: Vec<WordCount>,
}

impl WordFrequencyMap {
    pub fn new(entries: Vec<WordCount>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[WordCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn get(&self, word: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|e| e.word == word)
            .map(|e| e.count)
    }
}

impl Serialize for WordFrequencyMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for entry in &self.entries {
            map.serialize_entry(&entry.word, &entry.count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WordFrequencyMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RankVisitor;

        impl<'de> Visitor<'de> for RankVisitor {
            type Value = WordFrequencyMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of word to count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((word, count)) = access.next_entry::<String, u64>()? {
                    entries.push(WordCount { word, count });
                }
                Ok(WordFrequencyMap { entries })
            }
        }

        deserializer.deserialize_map(RankVisitor)
    }
}

/// Metadata and results of one pipeline run, for the run report.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Identifier of the run (also the run-scoped directory name).
    pub run_id: String,
    /// Which stage(s) were executed.
    pub stage: Stage,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in seconds.
    pub duration_seconds: f64,
    /// Number of identifiers fetched, when the fetcher ran.
    pub ids_fetched: Option<usize>,
    /// Number of item rows persisted, when the aggregator ran.
    pub rows: Option<usize>,
    /// First few rows of the table.
    pub preview: Vec<ItemRecord>,
    /// Item fetches skipped under the skip policy.
    pub failures: Vec<FetchFailure>,
    /// Word ranking, when the analyzer ran.
    pub top_words: Option<WordFrequencyMap>,
    /// Base64 data URI of the rendered chart.
    pub chart_uri: Option<String>,
}

impl RunSummary {
    pub fn new(run_id: String, stage: Stage, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            stage,
            started_at,
            duration_seconds: 0.0,
            ids_fetched: None,
            rows: None,
            preview: Vec::new(),
            failures: Vec::new(),
            top_words: None,
            chart_uri: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ItemRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_table_columns_are_union_in_first_seen_order() {
        let table: ItemTable = vec![
            record(json!({"id": 1, "title": "First"})),
            record(json!({"id": 2, "url": "https://example.com"})),
            record(json!({"id": 3, "score": 10, "title": "Third"})),
        ]
        .into_iter()
        .collect();

        assert_eq!(table.columns(), &["id", "title", "url", "score"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_titles_skip_rows_without_title() {
        let table: ItemTable = vec![
            record(json!({"id": 101, "title": "Hello World"})),
            record(json!({"id": 103})),
            record(json!({"id": 104, "title": null})),
        ]
        .into_iter()
        .collect();

        let titles: Vec<&str> = table.titles().collect();
        assert_eq!(titles, vec!["Hello World"]);
    }

    #[test]
    fn test_preview_is_bounded() {
        let table: ItemTable = (0..3).map(|i| record(json!({ "id": i }))).collect();
        assert_eq!(table.preview(5).len(), 3);
        assert_eq!(table.preview(2).len(), 2);
        assert!(ItemTable::new().preview(5).is_empty());
    }

    #[test]
    fn test_word_map_keeps_rank_order_in_json() {
        let map = WordFrequencyMap::new(vec![
            WordCount {
                word: "world".to_string(),
                count: 2,
            },
            WordCount {
                word: "hello".to_string(),
                count: 2,
            },
            WordCount {
                word: "there".to_string(),
                count: 1,
            },
        ]);

        let text = serde_json::to_string(&map).unwrap();
        assert_eq!(text, r#"{"world":2,"hello":2,"there":1}"#);

        let back: WordFrequencyMap = serde_json::from_str(&text).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_stage_selection() {
        assert!(Stage::All.runs_ids() && Stage::All.runs_items() && Stage::All.runs_words());
        assert!(Stage::Items.runs_items());
        assert!(!Stage::Items.runs_ids());
        assert!(!Stage::Words.runs_items());
    }
}
