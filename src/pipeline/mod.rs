//! The three pipeline stages and the run that chains them.
//!
//! Stages run strictly in order (ids, then items, then words). Each one
//! reads its input artifact from the store and writes its output back,
//! so any single stage can be re-run against existing artifacts.

pub mod aggregator;
pub mod analyzer;
pub mod fetcher;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::{run_aggregator, AggregatorSettings};
pub use analyzer::{run_analyzer, AnalyzerSettings};
pub use fetcher::fetch_top_identifiers;

use crate::client::StoryApi;
use crate::config::Config;
use crate::error::Result;
use crate::models::{RunSummary, Stage};
use crate::report;
use crate::store::ArtifactStore;
use chrono::{DateTime, Utc};
use std::time::Instant;
use tracing::{debug, info};

/// Everything a run needs besides the API and the store.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_ids: usize,
    pub aggregator: AggregatorSettings,
    pub analyzer: AnalyzerSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_ids: 100,
            aggregator: AggregatorSettings::default(),
            analyzer: AnalyzerSettings::default(),
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &Config, show_progress: bool) -> Self {
        let mut aggregator = AggregatorSettings::from(&config.fetch);
        aggregator.show_progress = show_progress;

        Self {
            max_ids: config.fetch.max_ids,
            aggregator,
            analyzer: AnalyzerSettings::from(&config.analysis),
        }
    }
}

/// Run id derived from the start time, e.g. `20261016T140000Z`.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Run the selected stage(s) while holding the store's run lock.
///
/// The first failing stage aborts the run; later stages never see a
/// partial result. A Markdown summary is written at the end.
pub async fn run_pipeline<A: StoryApi>(
    api: &A,
    store: &ArtifactStore,
    settings: &PipelineSettings,
    stage: Stage,
    run_id: String,
) -> Result<RunSummary> {
    let started_at = Utc::now();
    let timer = Instant::now();
    let lock = store.lock()?;
    debug!("Holding run lock {}", lock.path().display());

    info!("Run {} ({} stage) in {}", run_id, stage, store.dir().display());
    let mut summary = RunSummary::new(run_id, stage, started_at);

    if stage.runs_ids() {
        info!("Stage 1/3: fetching top story ids");
        let ids = fetch_top_identifiers(api, store, settings.max_ids).await?;
        summary.ids_fetched = Some(ids.len());
    }

    if stage.runs_items() {
        info!("Stage 2/3: fetching item details");
        let outcome = run_aggregator(api, store, &settings.aggregator).await?;
        summary.rows = Some(outcome.table.len());
        summary.preview = outcome
            .table
            .preview(settings.aggregator.preview_rows)
            .to_vec();
        summary.failures = outcome.failures;
    }

    if stage.runs_words() {
        info!("Stage 3/3: ranking title words");
        let outcome = run_analyzer(store, &settings.analyzer)?;
        summary.top_words = Some(outcome.words);
        summary.chart_uri = outcome.chart.map(|chart| chart.data_uri);
    }

    summary.duration_seconds = timer.elapsed().as_secs_f64();

    let markdown = report::generate_run_report(&summary);
    let path = store.write_summary(&markdown)?;
    info!("Run summary saved to {}", path.display());

    Ok(summary)
}
