//! Word frequencies over item titles.
//!
//! Titles are lower-cased, split on whitespace, trimmed of surrounding
//! punctuation, and counted unless they are stopwords. Ties in the
//! ranking go to the word seen first.

use crate::error::Result;
use crate::models::{ItemTable, WordCount, WordFrequencyMap};
use crate::report::chart::{self, RenderedChart};
use crate::store::ArtifactStore;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Characters trimmed from both ends of every token.
pub const STRIP_CHARS: &[char] = &['.', ',', '-', '!', '?', ':', ';', '(', ')', '[', ']', '\'', '"'];

/// Settings for the analyzer stage.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    /// Number of ranked words kept.
    pub top_words: usize,
    /// Lower-case words excluded from the ranking.
    pub stopwords: Vec<String>,
    /// Render and persist the bar chart.
    pub chart: bool,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            top_words: 25,
            stopwords: crate::config::default_stopwords(),
            chart: true,
        }
    }
}

impl From<&crate::config::AnalysisConfig> for AnalyzerSettings {
    fn from(config: &crate::config::AnalysisConfig) -> Self {
        Self {
            top_words: config.top_words,
            stopwords: config.stopwords.iter().map(|w| w.to_lowercase()).collect(),
            chart: config.chart,
        }
    }
}

/// Output of the analyzer stage.
#[derive(Debug, Clone)]
pub struct AnalyzerOutcome {
    pub words: WordFrequencyMap,
    pub chart: Option<RenderedChart>,
}

/// Split a title into counted tokens: lower-cased, trimmed, stopwords removed.
pub fn tokenize<'a>(title: &'a str, stopwords: &'a [String]) -> impl Iterator<Item = String> + 'a {
    title
        .split_whitespace()
        .map(|raw| raw.to_lowercase())
        .filter_map(move |lower| {
            let word = lower.trim_matches(STRIP_CHARS);
            if word.is_empty() || stopwords.iter().any(|s| s == word) {
                None
            } else {
                Some(word.to_string())
            }
        })
}

/// Rank the words in every title of the table.
///
/// Rows without a title are skipped. The result holds at most
/// `top_words` entries, highest count first; equal counts keep the order
/// in which the words were first seen.
pub fn compute_word_frequencies(table: &ItemTable, settings: &AnalyzerSettings) -> WordFrequencyMap {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<WordCount> = Vec::new();

    for title in table.titles() {
        for word in tokenize(title, &settings.stopwords) {
            match position.get(&word) {
                Some(&index) => counts[index].count += 1,
                None => {
                    position.insert(word.clone(), counts.len());
                    counts.push(WordCount { word, count: 1 });
                }
            }
        }
    }

    debug!("Counted {} distinct words", counts.len());

    // Stable: equal counts stay in first-seen order.
    counts.sort_by_key(|entry| std::cmp::Reverse(entry.count));
    counts.truncate(settings.top_words);

    WordFrequencyMap::new(counts)
}

/// Run the analyzer stage against the stored item table.
pub fn run_analyzer(store: &ArtifactStore, settings: &AnalyzerSettings) -> Result<AnalyzerOutcome> {
    let table = store.read_table()?;
    if table.is_empty() {
        warn!("Item table is empty; the word ranking will be empty too");
    } else {
        info!("Analyzing titles of {} items", table.len());
    }

    let words = compute_word_frequencies(&table, settings);
    let path = store.write_words(&words)?;
    info!("Saved {} top words to {}", words.len(), path.display());

    let chart = if settings.chart {
        let rendered = chart::render_chart(&words);
        let path = store.write_chart(&rendered.svg)?;
        info!("Saved word chart to {}", path.display());
        Some(rendered)
    } else {
        None
    };

    Ok(AnalyzerOutcome { words, chart })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::tempdir;

    fn table(values: Vec<Value>) -> ItemTable {
        values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect()
    }

    fn words(map: &WordFrequencyMap) -> Vec<(&str, u64)> {
        map.entries()
            .iter()
            .map(|e| (e.word.as_str(), e.count))
            .collect()
    }

    #[test]
    fn test_end_to_end_titles() {
        let table = table(vec![
            json!({"id": 101, "title": "Hello World"}),
            json!({"id": 102, "title": "hello there world"}),
        ]);

        let map = compute_word_frequencies(&table, &AnalyzerSettings::default());
        assert_eq!(words(&map), vec![("hello", 2), ("world", 2), ("there", 1)]);
    }

    #[test]
    fn test_stopwords_are_case_insensitive() {
        let table = table(vec![json!({"id": 1, "title": "The The the"})]);
        let map = compute_word_frequencies(&table, &AnalyzerSettings::default());
        assert!(map.is_empty());
    }

    #[test]
    fn test_punctuation_is_stripped() {
        let table = table(vec![
            json!({"id": 1, "title": "word!"}),
            json!({"id": 2, "title": "word"}),
            json!({"id": 3, "title": "(\"word\"), -- ... 'quoted'"}),
        ]);

        let map = compute_word_frequencies(&table, &AnalyzerSettings::default());
        assert_eq!(map.get("word"), Some(3));
        assert_eq!(map.get("quoted"), Some(1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_inner_punctuation_is_kept() {
        let tokens: Vec<String> = tokenize("Show HN: e-mail isn't node.js", &[]).collect();
        assert_eq!(tokens, vec!["show", "hn", "e-mail", "isn't", "node.js"]);
    }

    #[test]
    fn test_missing_title_is_skipped() {
        let table = table(vec![
            json!({"id": 103}),
            json!({"id": 104, "title": "Rust"}),
        ]);
        let map = compute_word_frequencies(&table, &AnalyzerSettings::default());
        assert_eq!(words(&map), vec![("rust", 1)]);
    }

    #[test]
    fn test_empty_table() {
        let map = compute_word_frequencies(&ItemTable::new(), &AnalyzerSettings::default());
        assert!(map.is_empty());
    }

    #[test]
    fn test_ranking_is_capped_and_counts_positive() {
        let titles: Vec<Value> = (0..40)
            .map(|i| json!({ "id": i, "title": format!("word{} common", i) }))
            .collect();
        let map = compute_word_frequencies(&table(titles), &AnalyzerSettings::default());

        assert_eq!(map.len(), 25);
        assert_eq!(map.entries()[0].word, "common");
        assert_eq!(map.entries()[0].count, 40);
        assert!(map.entries().iter().all(|e| e.count >= 1));
        // Ties keep first-seen order.
        assert_eq!(map.entries()[1].word, "word0");
        assert_eq!(map.entries()[24].word, "word23");
    }

    #[test]
    fn test_custom_stopwords_and_limit() {
        let settings = AnalyzerSettings {
            top_words: 1,
            stopwords: vec!["rust".to_string()],
            chart: false,
        };
        let table = table(vec![json!({"title": "Rust rust go go go zig"})]);
        let map = compute_word_frequencies(&table, &settings);
        assert_eq!(words(&map), vec![("go", 3)]);
    }

    #[test]
    fn test_idempotent() {
        let table = table(vec![
            json!({"title": "b a c b"}),
            json!({"title": "c d b"}),
        ]);
        let settings = AnalyzerSettings::default();
        assert_eq!(
            compute_word_frequencies(&table, &settings),
            compute_word_frequencies(&table, &settings)
        );
    }

    #[test]
    fn test_run_analyzer_persists_words_and_chart() {
        let tmp = tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store
            .write_table(&table(vec![json!({"id": 1, "title": "Hello World"})]))
            .unwrap();

        let outcome = run_analyzer(&store, &AnalyzerSettings::default()).unwrap();
        assert_eq!(outcome.words.len(), 2);
        assert!(outcome.chart.is_some());

        let stored = store.read_words().unwrap();
        assert_eq!(stored, outcome.words);
        assert!(store.path(crate::store::Artifact::Chart).exists());
    }

    #[test]
    fn test_run_analyzer_without_table() {
        let tmp = tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let err = run_analyzer(&store, &AnalyzerSettings::default()).unwrap_err();
        assert!(matches!(
            err,
            crate::error::PipelineError::MissingArtifact { .. }
        ));
    }

    #[test]
    fn test_run_analyzer_on_empty_table() {
        let tmp = tempdir().unwrap();
        let store = ArtifactStore::new(tmp.path());
        store.write_table(&ItemTable::new()).unwrap();

        let outcome = run_analyzer(&store, &AnalyzerSettings::default()).unwrap();
        assert!(outcome.words.is_empty());
        assert_eq!(store.read_words().unwrap(), WordFrequencyMap::default());
    }
}
