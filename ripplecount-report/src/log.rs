//! Trial Log
//!
//! Line-oriented CSV log of trial totals:
//!
//! ```text
//! iteration,n_ticks
//! 1,188416
//! 2,188424
//! # trial 2 invalid: toggle ran 80 us late (half period 61 us)
//! # mean: 188420.0000
//! ```
//!
//! Lines starting with `#` are comments and are skipped by readers.

use ripplecount_core::{TrialRecord, TrialStatus};
use ripplecount_stats::{StatsError, SummaryStatistics};
use std::io::{BufRead, Write};
use thiserror::Error;

/// CSV header line
pub const LOG_HEADER: &str = "iteration,n_ticks";

/// Errors reading or writing a trial log
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing header (expected \"iteration,n_ticks\")")]
    MissingHeader,

    #[error("Line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// One parsed log row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRow {
    /// 1-based trial index
    pub iteration: usize,
    /// Reconstructed pulse total
    pub n_ticks: u64,
}

/// Streams trial records into a CSV log, one flushed line per trial
pub struct TrialLogWriter<W: Write> {
    out: W,
}

impl<W: Write> TrialLogWriter<W> {
    /// Start a log, writing the header
    pub fn new(out: W) -> Result<Self, LogError> {
        let mut writer = Self { out };
        writer.line(LOG_HEADER)?;
        Ok(writer)
    }

    /// Continue a log that already has its header
    pub fn resume(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, line: &str) -> Result<(), LogError> {
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }

    /// Append one trial row (and a comment if it was flagged)
    pub fn record(&mut self, record: &TrialRecord) -> Result<(), LogError> {
        self.line(&format!("{},{}", record.index, record.total_count))?;
        if let TrialStatus::Invalid { reason } = &record.status {
            self.line(&format!("# trial {} invalid: {}", record.index, reason))?;
        }
        Ok(())
    }

    /// Append the summary footer as comments
    pub fn summary(
        &mut self,
        summary: &Result<SummaryStatistics, StatsError>,
    ) -> Result<(), LogError> {
        match summary {
            Ok(s) => {
                self.line(&format!("# mean: {:.4}", s.mean))?;
                self.line(&format!("# variance: {:.4}", s.variance))?;
                self.line(&format!("# stddev: {:.4}", s.std_dev))?;
                match s.mean_variance_ratio {
                    Some(r) => self.line(&format!("# R approx (mean/variance): {:.6}", r))?,
                    None => self.line("# R approx (mean/variance): undefined")?,
                }
            }
            Err(e) => self.line(&format!("# summary unavailable: {}", e))?,
        }
        Ok(())
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Parse a trial log, skipping blank lines and `#` comments
pub fn read_trial_log<R: BufRead>(reader: R) -> Result<Vec<LogRow>, LogError> {
    let mut rows = Vec::new();
    let mut seen_header = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if !seen_header {
            if trimmed.replace(' ', "") != LOG_HEADER {
                return Err(LogError::MissingHeader);
            }
            seen_header = true;
            continue;
        }

        let (iteration, n_ticks) = trimmed.split_once(',').ok_or_else(|| LogError::Malformed {
            line: line_no,
            message: format!("expected 2 fields, got \"{}\"", trimmed),
        })?;

        let iteration = iteration
            .trim()
            .parse::<usize>()
            .map_err(|e| LogError::Malformed {
                line: line_no,
                message: format!("bad iteration \"{}\": {}", iteration.trim(), e),
            })?;
        let n_ticks = n_ticks.trim().parse::<u64>().map_err(|e| LogError::Malformed {
            line: line_no,
            message: format!("bad n_ticks \"{}\": {}", n_ticks.trim(), e),
        })?;

        rows.push(LogRow { iteration, n_ticks });
    }

    if !seen_header {
        return Err(LogError::MissingHeader);
    }
    Ok(rows)
}
