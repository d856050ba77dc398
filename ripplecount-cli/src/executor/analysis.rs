//! Offline Analysis
//!
//! Re-reads a finished trial log and detrends its totals.

use ripplecount_report::{LogRow, read_trial_log};
use ripplecount_stats::{DetrendAnalysis, detrend};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// Detrend the totals of already parsed log rows
pub fn analyze_rows(
    rows: &[LogRow],
    window: usize,
    quantization_step: u64,
) -> anyhow::Result<DetrendAnalysis> {
    let values: Vec<f64> = rows.iter().map(|r| r.n_ticks as f64).collect();
    Ok(detrend(&values, window, quantization_step)?)
}

/// Read a trial log from `path` and detrend it
pub fn analyze_log(
    path: &Path,
    window: usize,
    quantization_step: u64,
) -> anyhow::Result<DetrendAnalysis> {
    let file = File::open(path)
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", path.display(), e))?;
    let rows = read_trial_log(BufReader::new(file))?;
    debug!(rows = rows.len(), path = %path.display(), "read trial log");
    analyze_rows(&rows, window, quantization_step)
}
