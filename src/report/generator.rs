//! Markdown run summary.
//!
//! This module renders a human-readable summary of one pipeline run:
//! metadata, a preview of the item table, skipped fetches, the word
//! ranking and the embedded chart. Nothing in the pipeline reads it back.

use crate::models::{FetchFailure, ItemRecord, RunSummary, WordFrequencyMap, TITLE_FIELD};
use serde_json::Value;

/// Generate the complete Markdown summary.
pub fn generate_run_report(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str("# Hacker News Top Stories\n\n");
    output.push_str(&generate_metadata_section(summary));
    output.push_str(&generate_preview_section(&summary.preview));
    output.push_str(&generate_failures_section(&summary.failures));

    if let Some(ref words) = summary.top_words {
        output.push_str(&generate_words_section(words));
    }

    if let Some(ref uri) = summary.chart_uri {
        output.push_str("## Chart\n\n");
        output.push_str(&format!("![{}]({})\n\n", super::chart::CHART_TITLE, uri));
    }

    output.push_str("---\n\n");
    output.push_str(&format!(
        "*Generated by hnpulse v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

/// Generate the metadata section.
fn generate_metadata_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Run\n\n");
    section.push_str(&format!("- **Run:** `{}`\n", summary.run_id));
    section.push_str(&format!("- **Stage:** {}\n", summary.stage));
    section.push_str(&format!(
        "- **Started:** {}\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(ids) = summary.ids_fetched {
        section.push_str(&format!("- **Ids Fetched:** {}\n", ids));
    }
    if let Some(rows) = summary.rows {
        section.push_str(&format!("- **Rows:** {}\n", rows));
    }
    if !summary.failures.is_empty() {
        section.push_str(&format!(
            "- **Failed Fetches:** {}\n",
            summary.failures.len()
        ));
    }
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n\n",
        summary.duration_seconds
    ));

    section
}

fn generate_preview_section(rows: &[ItemRecord]) -> String {
    if rows.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Preview\n\n");
    section.push_str("| Id | Title | Score |\n");
    section.push_str("|:---|:---|:---:|\n");

    for row in rows {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            cell(row.get("id")),
            cell(row.get(TITLE_FIELD)),
            cell(row.get("score"))
        ));
    }
    section.push('\n');

    section
}

fn generate_failures_section(failures: &[FetchFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Skipped Items\n\n");
    for failure in failures {
        section.push_str(&format!("- `{}`: {}\n", failure.id, failure.message));
    }
    section.push('\n');

    section
}

fn generate_words_section(words: &WordFrequencyMap) -> String {
    let mut section = String::new();
    section.push_str("## Most Frequent Words\n\n");

    if words.is_empty() {
        section.push_str("No titles to analyze.\n\n");
        return section;
    }

    section.push_str("| # | Word | Count |\n");
    section.push_str("|:---:|:---|:---:|\n");
    for (rank, entry) in words.entries().iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            rank + 1,
            escape_cell(&entry.word),
            entry.count
        ));
    }
    section.push('\n');

    section
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(s)) => escape_cell(s),
        Some(other) => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
