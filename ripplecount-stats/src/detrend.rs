//! Detrending Analysis
//!
//! Offline analysis of a finished trial log. Slow drift (mostly temperature)
//! is removed with a centered moving average, then the variance is corrected
//! for the quantization noise of the unwired low counter bits.
//!
//! Measured variances here are population variances (divisor `N`), unlike
//! the run summary in [`crate::summary`].

use crate::summary::{StatsError, mean};
use serde::{Deserialize, Serialize};

/// Variance and ratio for one series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesAnalysis {
    /// Series mean
    pub mean: f64,
    /// Population variance as measured
    pub measured_variance: f64,
    /// `max(0, measured - quantization)`
    pub real_variance: f64,
    /// Square root of the real variance
    pub real_std: f64,
    /// `mean / real_variance`; `None` when the real variance is zero
    pub r_ratio: Option<f64>,
}

/// Original and temperature-corrected series side by side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetrendAnalysis {
    /// Moving average window
    pub window: usize,
    /// Quantization step of the sampled residue
    pub quantization_step: u64,
    /// `step^2 / 12`
    pub quantization_variance: f64,
    /// Centered moving average of the input
    pub trend: Vec<f64>,
    /// Input with the trend removed (mean preserved)
    pub detrended: Vec<f64>,
    /// Statistics of the raw input
    pub original: SeriesAnalysis,
    /// Statistics of the detrended series
    pub corrected: SeriesAnalysis,
}

/// Variance of uniform quantization noise with the given step
pub fn quantization_variance(step: u64) -> f64 {
    (step as f64).powi(2) / 12.0
}

/// Population variance (divisor `N`)
pub fn population_variance(samples: &[f64]) -> Result<f64, StatsError> {
    let m = mean(samples)?;
    Ok(samples.iter().map(|x| (x - m).powi(2)).sum::<f64>() / samples.len() as f64)
}

/// Centered rolling mean with partial windows at the edges.
///
/// The window for index `i` covers `[i - w/2, i + (w-1) - w/2]`, clipped to
/// the series, and is averaged over however many points it holds.
pub fn moving_average(values: &[f64], window: usize) -> Result<Vec<f64>, StatsError> {
    if window == 0 {
        return Err(StatsError::InvalidWindow(window));
    }

    let n = values.len();
    let before = window / 2;
    let after = window - 1 - before;

    // Prefix sums keep this linear in the series length
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for v in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + v);
    }

    Ok((0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after).min(n - 1);
            (prefix[hi + 1] - prefix[lo]) / (hi - lo + 1) as f64
        })
        .collect())
}

fn analyze_series(values: &[f64], quantization: f64) -> Result<SeriesAnalysis, StatsError> {
    let mean = mean(values)?;
    let measured_variance = population_variance(values)?;
    let real_variance = (measured_variance - quantization).max(0.0);
    let r_ratio = if real_variance > 0.0 {
        Some(mean / real_variance)
    } else {
        None
    };
    Ok(SeriesAnalysis {
        mean,
        measured_variance,
        real_variance,
        real_std: real_variance.sqrt(),
        r_ratio,
    })
}

/// Detrend `values` and compare the variance before and after
pub fn detrend(
    values: &[f64],
    window: usize,
    quantization_step: u64,
) -> Result<DetrendAnalysis, StatsError> {
    let trend = moving_average(values, window)?;
    let overall = mean(values)?;
    let detrended: Vec<f64> = values
        .iter()
        .zip(&trend)
        .map(|(v, t)| v - (t - overall))
        .collect();

    let quantization = quantization_variance(quantization_step);
    let original = analyze_series(values, quantization)?;
    let corrected = analyze_series(&detrended, quantization)?;

    Ok(DetrendAnalysis {
        window,
        quantization_step,
        quantization_variance: quantization,
        trend,
        detrended,
        original,
        corrected,
    })
}
