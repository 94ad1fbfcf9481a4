//! Reporting: the word chart and the Markdown run summary.

pub mod chart;
pub mod generator;

pub use generator::generate_run_report;
