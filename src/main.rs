//! hnpulse - Hacker News top-story word frequencies
//!
//! A three-stage batch pipeline: fetch the top-story ids, fetch every
//! item's metadata into a CSV table, and rank the most frequent words in
//! the titles.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (network, missing artifact, lock held, config, etc.)

mod cli;
mod client;
mod config;
mod error;
mod models;
mod pipeline;
mod report;
mod schedule;
mod store;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use client::{ClientConfig, HnClient};
use config::{Config, CONFIG_FILE_NAME};
use models::{RunSummary, Stage};
use pipeline::PipelineSettings;
use std::path::Path;
use store::ArtifactStore;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("hnpulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = if args.hourly {
        run_hourly(args).await
    } else {
        run_once_from_args(&args).await.map(|_| ())
    };

    if let Err(e) = result {
        error!("Pipeline failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .hnpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the API, limits, stopwords, and storage.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from {}", CONFIG_FILE_NAME);
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {:#}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Run the pipeline once with the configuration the arguments describe.
async fn run_once_from_args(args: &Args) -> Result<RunSummary> {
    let config = load_config(args)?;

    // The config file can turn on run-scoped storage too.
    if let Err(e) =
        cli::check_stage_scope(args.stage, config.storage.run_scoped, args.run_id.as_deref())
    {
        anyhow::bail!(e);
    }

    let run_id = args
        .run_id
        .clone()
        .unwrap_or_else(|| pipeline::new_run_id(Utc::now()));

    run_once(&config, args.stage, run_id, !args.quiet, args.force_unlock).await
}

async fn run_once(
    config: &Config,
    stage: Stage,
    run_id: String,
    show_progress: bool,
    force_unlock: bool,
) -> Result<RunSummary> {
    let store = if config.storage.run_scoped {
        ArtifactStore::run_scoped(&config.storage.data_dir, &run_id)
    } else {
        ArtifactStore::new(&config.storage.data_dir)
    };

    if force_unlock && !store.force_unlock()? {
        info!("No run lock to remove in {}", store.dir().display());
    }

    let client = HnClient::new(ClientConfig::from(&config.api))
        .context("Failed to create HTTP client")?;
    let settings = PipelineSettings::from_config(config, show_progress);

    println!("📥 Fetching from {}", config.api.base_url);
    let summary = pipeline::run_pipeline(&client, &store, &settings, stage, run_id).await?;

    print_summary(&summary, &store);
    Ok(summary)
}

/// Run the full chain now and again at the top of every hour until Ctrl-C.
async fn run_hourly(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    info!("Hourly schedule enabled; press Ctrl-C to stop");
    let mut force_unlock = args.force_unlock;

    loop {
        let run_id = pipeline::new_run_id(Utc::now());
        let run = run_once(&config, Stage::All, run_id, !args.quiet, force_unlock);
        force_unlock = false;
        match schedule::until_shutdown(run, tokio::signal::ctrl_c()).await {
            Some(Ok(_)) => {}
            Some(Err(e)) => error!("Scheduled run failed: {:#}", e),
            None => {
                warn!("Received Ctrl-C during a run, stopping schedule");
                return Ok(());
            }
        }

        let delay = schedule::delay_until_next_run(Utc::now());
        info!(
            "Next run at {}",
            schedule::next_hourly_run(Utc::now()).format("%Y-%m-%d %H:%M:%S UTC")
        );

        let wait = tokio::time::sleep(delay);
        if schedule::until_shutdown(wait, tokio::signal::ctrl_c()).await.is_none() {
            info!("Received Ctrl-C, stopping schedule");
            return Ok(());
        }
    }
}

fn print_summary(summary: &RunSummary, store: &ArtifactStore) {
    println!("\n📊 Run Summary:");
    if let Some(ids) = summary.ids_fetched {
        println!("   Ids fetched: {}", ids);
    }
    if let Some(rows) = summary.rows {
        println!("   Items saved: {}", rows);
    }
    if !summary.failures.is_empty() {
        println!("   Items skipped: {}", summary.failures.len());
    }
    if let Some(ref words) = summary.top_words {
        let top: Vec<String> = words
            .entries()
            .iter()
            .take(10)
            .map(|e| format!("{} ({})", e.word, e.count))
            .collect();
        println!("   Top words: {}", top.join(", "));
    }
    println!("   Duration: {:.1}s", summary.duration_seconds);
    println!("\n✅ Done! Artifacts in: {}", store.dir().display());
}
