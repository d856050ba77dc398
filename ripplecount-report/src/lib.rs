#![warn(missing_docs)]
//! ripplecount Report - Logs and Reports
//!
//! Output of a trial run:
//! - CSV trial log (`iteration,n_ticks`), streamed one line per trial
//! - JSON report (machine-readable, full run record)
//!
//! Human-readable terminal output lives with the CLI.

mod json;
mod log;
mod report;

pub use json::generate_json_report;
pub use log::{LOG_HEADER, LogError, LogRow, TrialLogWriter, read_trial_log};
pub use report::{RunMeta, RunReport, RunSummary};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Trial log CSV
    Csv,
    /// JSON with the full run record
    Json,
    /// Human-readable terminal output
    Human,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "human" | "text" => Ok(OutputFormat::Human),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
