//! Per-item detail fetch.
//!
//! Fetches one record per stored identifier and accumulates them into
//! an [`ItemTable`]. Requests go through an ordered buffered stream, so
//! rows always come out in identifier order whatever the concurrency.

use crate::client::StoryApi;
use crate::error::Result;
use crate::models::{FetchFailure, ItemErrorPolicy, ItemId, ItemRecord, ItemTable, TITLE_FIELD};
use crate::store::ArtifactStore;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{info, warn};

/// Settings for the aggregator stage.
#[derive(Debug, Clone)]
pub struct AggregatorSettings {
    /// Number of item requests in flight at once.
    pub concurrency: usize,
    /// Log a progress notice every N collected items.
    pub progress_every: usize,
    /// What to do when one item fetch fails.
    pub on_item_error: ItemErrorPolicy,
    /// Show a terminal progress bar.
    pub show_progress: bool,
    /// Rows included in the logged preview.
    pub preview_rows: usize,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            progress_every: 20,
            on_item_error: ItemErrorPolicy::Abort,
            show_progress: false,
            preview_rows: 5,
        }
    }
}

impl From<&crate::config::FetchConfig> for AggregatorSettings {
    fn from(config: &crate::config::FetchConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            progress_every: config.progress_every,
            on_item_error: config.on_item_error,
            ..Self::default()
        }
    }
}

/// Rows collected plus any failures skipped along the way.
#[derive(Debug, Clone, Default)]
pub struct AggregateOutcome {
    pub table: ItemTable,
    pub failures: Vec<FetchFailure>,
}

/// Fetch every identifier's record, in order.
///
/// Under [`ItemErrorPolicy::Abort`] the first failure is returned and
/// nothing is kept. Under [`ItemErrorPolicy::Skip`] failures are recorded
/// and the remaining items are still fetched.
pub async fn fetch_item_details<A: StoryApi>(
    api: &A,
    ids: &[ItemId],
    settings: &AggregatorSettings,
) -> Result<AggregateOutcome> {
    let progress = progress_bar(ids.len(), settings.show_progress);
    let mut outcome = AggregateOutcome::default();

    let mut results = stream::iter(ids.iter().copied())
        .map(|id| async move { (id, api.item(id).await) })
        .buffered(settings.concurrency.max(1));

    while let Some((id, result)) = results.next().await {
        progress.inc(1);

        match result {
            Ok(record) => {
                outcome.table.push(record);

                let collected = outcome.table.len();
                if progress_due(collected, settings.progress_every) {
                    info!("Got {} items so far.", collected);
                }
            }
            Err(e) => match settings.on_item_error {
                ItemErrorPolicy::Abort => {
                    progress.abandon();
                    return Err(e);
                }
                ItemErrorPolicy::Skip => {
                    warn!("Skipping item {}: {}", id, e);
                    outcome.failures.push(FetchFailure {
                        id,
                        message: e.to_string(),
                    });
                }
            },
        }
    }

    progress.finish_and_clear();
    Ok(outcome)
}

/// Run the aggregator stage: read ids, fetch details, persist the table.
pub async fn run_aggregator<A: StoryApi>(
    api: &A,
    store: &ArtifactStore,
    settings: &AggregatorSettings,
) -> Result<AggregateOutcome> {
    let ids = store.read_ids()?;
    info!("Fetching details for {} items", ids.len());

    let outcome = fetch_item_details(api, &ids, settings).await?;
    let path = store.write_table(&outcome.table)?;

    info!(
        "Saved {} rows ({} columns) to {}",
        outcome.table.len(),
        outcome.table.columns().len(),
        path.display()
    );
    if !outcome.failures.is_empty() {
        warn!("{} item fetches failed and were skipped", outcome.failures.len());
    }
    for row in outcome.table.preview(settings.preview_rows) {
        let line = preview_line(row);
        info!("  {}", line);
    }

    Ok(outcome)
}

/// Whether the progress notice is due after `collected` items. Zero disables it.
fn progress_due(collected: usize, every: usize) -> bool {
    every > 0 && collected > 0 && collected % every == 0
}

/// One `id | title` line of the logged table preview.
fn preview_line(row: &ItemRecord) -> String {
    let id = row.get("id").map(Value::to_string).unwrap_or_default();
    let title = row.get(TITLE_FIELD).and_then(Value::as_str).unwrap_or("-");
    format!("{} | {}", id, title)
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items ({eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pb.set_style(style);
    pb
}
