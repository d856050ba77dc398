#![warn(missing_docs)]
//! ripplecount Statistical Engine
//!
//! Provides the statistics computed over trial totals:
//! - Run summary: mean, sample variance (N - 1), standard deviation and the
//!   mean/variance ratio
//! - Offline detrending: centered moving average, quantization-noise
//!   correction and per-series ratios

mod detrend;
mod summary;

pub use detrend::{
    DetrendAnalysis, SeriesAnalysis, detrend, moving_average, population_variance,
    quantization_variance,
};
pub use summary::{
    StatsError, SummaryStatistics, mean, std_dev, summarize, summarize_counts, variance,
};

/// Default moving average window for detrending
pub const DEFAULT_DETREND_WINDOW: usize = 40;

/// Minimum trials for a defined sample variance
pub const MIN_SUMMARY_SAMPLES: usize = 2;
