//! Summary Statistics
//!
//! Mean, sample variance and standard deviation over trial totals.
//! The variance divisor is `N - 1`; fewer than two samples is an error rather
//! than a NaN.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from statistics computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("No samples")]
    Empty,

    #[error("Insufficient samples: got {got}, need at least {min}")]
    InsufficientSamples { got: usize, min: usize },

    #[error("Invalid window size: {0}")]
    InvalidWindow(usize),
}

/// Summary of a complete trial sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStatistics {
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample variance (divisor `N - 1`)
    pub variance: f64,
    /// Square root of the variance
    pub std_dev: f64,
    /// `mean / variance` ("R approx"); `None` when the variance is zero
    pub mean_variance_ratio: Option<f64>,
}

/// Arithmetic mean
pub fn mean(samples: &[f64]) -> Result<f64, StatsError> {
    if samples.is_empty() {
        return Err(StatsError::Empty);
    }
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Sample variance around `mean`, divisor `N - 1`
pub fn variance(samples: &[f64], mean: f64) -> Result<f64, StatsError> {
    if samples.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            got: samples.len(),
            min: 2,
        });
    }
    let sum_sq = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    Ok(sum_sq / (samples.len() - 1) as f64)
}

/// Sample standard deviation
pub fn std_dev(samples: &[f64], mean: f64) -> Result<f64, StatsError> {
    variance(samples, mean).map(f64::sqrt)
}

/// Compute the full summary in one pass over the inputs
pub fn summarize(samples: &[f64]) -> Result<SummaryStatistics, StatsError> {
    if samples.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            got: samples.len(),
            min: 2,
        });
    }

    let mean = mean(samples)?;
    let variance = variance(samples, mean)?;
    let mean_variance_ratio = if variance == 0.0 {
        None
    } else {
        Some(mean / variance)
    };

    Ok(SummaryStatistics {
        count: samples.len(),
        mean,
        variance,
        std_dev: variance.sqrt(),
        mean_variance_ratio,
    })
}

/// Convenience wrapper for integer trial totals
pub fn summarize_counts(counts: &[u64]) -> Result<SummaryStatistics, StatsError> {
    let samples: Vec<f64> = counts.iter().map(|&c| c as f64).collect();
    summarize(&samples)
}

impl SummaryStatistics {
    /// Coefficient of variation (relative stddev, percent)
    pub fn coefficient_of_variation(&self) -> f64 {
        if self.mean == 0.0 {
            0.0
        } else {
            (self.std_dev / self.mean) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_values() {
        let samples = vec![10.0, 20.0, 30.0];
        let m = mean(&samples).unwrap();
        assert!((m - 20.0).abs() < f64::EPSILON);
        assert!((variance(&samples, m).unwrap() - 100.0).abs() < f64::EPSILON);
        assert!((std_dev(&samples, m).unwrap() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert!((summary.mean - 20.0).abs() < f64::EPSILON);
        assert!((summary.variance - 100.0).abs() < f64::EPSILON);
        assert!((summary.std_dev - 10.0).abs() < f64::EPSILON);
        assert!((summary.mean_variance_ratio.unwrap() - 0.2).abs() < 1e-12);
        assert!((summary.coefficient_of_variation() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_samples() {
        assert_eq!(
            summarize(&[5.0]),
            Err(StatsError::InsufficientSamples { got: 1, min: 2 })
        );
        assert_eq!(
            variance(&[5.0], 5.0),
            Err(StatsError::InsufficientSamples { got: 1, min: 2 })
        );
        assert_eq!(mean(&[]), Err(StatsError::Empty));
    }

    #[test]
    fn test_zero_variance_has_no_ratio() {
        let summary = summarize_counts(&[32_868, 32_868, 32_868]).unwrap();
        assert_eq!(summary.variance, 0.0);
        assert_eq!(summary.mean_variance_ratio, None);
    }
}
