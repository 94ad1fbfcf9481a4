//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hnpulse.toml` files.

use crate::models::ItemErrorPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".hnpulse.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Fetch stage settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Analyzer settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Artifact storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Remote API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the news API (no trailing slash).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://hacker-news.firebaseio.com/v0".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Identifier and item fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Maximum number of identifiers kept from the ranking.
    #[serde(default = "default_max_ids")]
    pub max_ids: usize,

    /// Number of item requests in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Emit a progress notice every N completed item fetches.
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,

    /// What to do when one item fetch fails.
    #[serde(default)]
    pub on_item_error: ItemErrorPolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_ids: default_max_ids(),
            concurrency: default_concurrency(),
            progress_every: default_progress_every(),
            on_item_error: ItemErrorPolicy::Abort,
        }
    }
}

fn default_max_ids() -> usize {
    100
}

fn default_concurrency() -> usize {
    1 // one request at a time
}

fn default_progress_every() -> usize {
    20
}

/// Word-frequency settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of ranked words kept.
    #[serde(default = "default_top_words")]
    pub top_words: usize,

    /// Words excluded from the ranking.
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,

    /// Render the bar chart.
    #[serde(default = "default_true")]
    pub chart: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_words: default_top_words(),
            stopwords: default_stopwords(),
            chart: true,
        }
    }
}

fn default_top_words() -> usize {
    25
}

pub(crate) fn default_stopwords() -> Vec<String> {
    vec![
        "a", "the", "an", "of", "to", "in", "for", "and", "with", "on", "is",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_true() -> bool {
    true
}

/// Artifact storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the stage artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Write each run into its own `runs/<run_id>` directory.
    #[serde(default)]
    pub run_scoped: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            run_scoped: false,
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }

        if let Some(max_ids) = args.max_ids {
            self.fetch.max_ids = max_ids;
        }
        if let Some(concurrency) = args.concurrency {
            self.fetch.concurrency = concurrency;
        }
        if let Some(policy) = args.on_item_error {
            self.fetch.on_item_error = policy;
        }

        if let Some(top_words) = args.top_words {
            self.analysis.top_words = top_words;
        }
        if args.no_chart {
            self.analysis.chart = false;
        }

        if let Some(ref dir) = args.data_dir {
            self.storage.data_dir = dir.display().to_string();
        }
        if args.run_scoped || args.run_id.is_some() {
            self.storage.run_scoped = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
