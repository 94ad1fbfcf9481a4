//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Most options are optional so that
//! values from `.hnpulse.toml` survive unless overridden.

use crate::models::{ItemErrorPolicy, Stage};
use clap::Parser;
use std::path::PathBuf;

/// hnpulse - Hacker News top-story word frequencies
///
/// Fetches the current top stories, stores their metadata as CSV,
/// and ranks the most frequent words in their titles.
///
/// Examples:
///   hnpulse
///   hnpulse --stage words --data-dir ./data
///   hnpulse --concurrency 8 --on-item-error skip
///   hnpulse --hourly --run-scoped
///   hnpulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Which stage(s) to run
    ///
    /// Single stages read the previous stage's artifact from the data directory.
    #[arg(long, default_value = "all", value_name = "STAGE")]
    pub stage: Stage,

    /// Base URL of the news API
    #[arg(long, value_name = "URL", env = "HNPULSE_API_URL")]
    pub api_url: Option<String>,

    /// Directory holding the stage artifacts
    #[arg(short, long, value_name = "DIR", env = "HNPULSE_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write artifacts into data/runs/<run-id>/
    #[arg(long)]
    pub run_scoped: bool,

    /// Reuse (or name) a run-scoped directory; implies --run-scoped
    #[arg(long, value_name = "ID")]
    pub run_id: Option<String>,

    /// Maximum number of top-story identifiers to keep
    #[arg(long, value_name = "COUNT")]
    pub max_ids: Option<usize>,

    /// Number of ranked words to keep
    #[arg(long, value_name = "COUNT")]
    pub top_words: Option<usize>,

    /// Number of item requests in flight at once
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// What to do when a single item fetch fails (abort, skip)
    #[arg(long, value_name = "POLICY")]
    pub on_item_error: Option<ItemErrorPolicy>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Do not render the word chart
    #[arg(long)]
    pub no_chart: bool,

    /// Keep running and repeat the full pipeline at the top of every hour
    #[arg(long)]
    pub hourly: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .hnpulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Remove a leftover run lock before running
    ///
    /// Only needed when a crashed run's lock cannot be detected as stale.
    #[arg(long)]
    pub force_unlock: bool,

    /// Generate a default .hnpulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.max_ids == Some(0) {
            return Err("Max ids must be at least 1".to_string());
        }

        if self.top_words == Some(0) {
            return Err("Top words must be at least 1".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref run_id) = self.run_id {
            if run_id.is_empty() || run_id.contains(['/', '\\']) || run_id.starts_with('.') {
                return Err(format!("Invalid run id: {:?}", run_id));
            }
        }

        check_stage_scope(self.stage, self.run_scoped, self.run_id.as_deref())?;

        if self.hourly && self.stage != Stage::All {
            return Err("--hourly always runs every stage; drop --stage".to_string());
        }

        if self.hourly && self.run_id.is_some() {
            return Err("--hourly generates a run id per run; drop --run-id".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

/// The items and words stages read the previous stage's artifact, so in
/// run-scoped mode they need `--run-id` to point at an existing run.
pub fn check_stage_scope(stage: Stage, run_scoped: bool, run_id: Option<&str>) -> Result<(), String> {
    let reads_upstream = matches!(stage, Stage::Items | Stage::Words);
    if reads_upstream && run_scoped && run_id.is_none() {
        return Err(format!(
            "--stage {} in run-scoped mode needs --run-id of an earlier run",
            stage
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            stage: Stage::All,
            api_url: None,
            data_dir: None,
            run_scoped: false,
            run_id: None,
            max_ids: None,
            top_words: None,
            concurrency: None,
            on_item_error: None,
            timeout: None,
            no_chart: false,
            hourly: false,
            config: None,
            verbose: false,
            quiet: false,
            force_unlock: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "hnpulse",
            "--stage",
            "words",
            "--on-item-error",
            "skip",
            "--concurrency",
            "4",
        ])
        .unwrap();
        assert_eq!(args.stage, Stage::Words);
        assert_eq!(args.on_item_error, Some(ItemErrorPolicy::Skip));
        assert_eq!(args.concurrency, Some(4));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.api_url = Some("ftp://example.com".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut args = make_args();
        args.concurrency = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.max_ids = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_run_id() {
        let mut args = make_args();
        args.run_id = Some("../escape".to_string());
        assert!(args.validate().is_err());

        args.run_id = Some("20260101T000000Z".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_hourly_requires_all_stages() {
        let mut args = make_args();
        args.hourly = true;
        assert!(args.validate().is_ok());

        args.stage = Stage::Words;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_run_scoped_single_stage_needs_run_id() {
        let mut args = make_args();
        args.run_scoped = true;
        assert!(args.validate().is_ok());

        args.stage = Stage::Items;
        assert!(args.validate().is_err());

        args.run_id = Some("20260101T000000Z".to_string());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_check_stage_scope() {
        assert!(check_stage_scope(Stage::Words, false, None).is_ok());
        assert!(check_stage_scope(Stage::All, true, None).is_ok());
        assert!(check_stage_scope(Stage::Ids, true, None).is_ok());
        assert!(check_stage_scope(Stage::Items, true, None).is_err());
        assert!(check_stage_scope(Stage::Words, true, Some("earlier")).is_ok());
    }

    #[test]
    fn test_parse_force_unlock() {
        let args = Args::try_parse_from(["hnpulse", "--force-unlock"]).unwrap();
        assert!(args.force_unlock);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
