//! Report Data Structures

use chrono::{DateTime, Utc};
use ripplecount_core::{SimulationConfig, TrialConfig, TrialRecord};
use ripplecount_stats::{MIN_SUMMARY_SAMPLES, StatsError, SummaryStatistics, summarize_counts};
use serde::{Deserialize, Serialize};

/// Complete run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub trials: Vec<TrialRecord>,
    pub summary: RunSummary,
}

/// Report metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub config: TrialConfig,
    /// Present when the run used the simulated rig
    pub simulation: Option<SimulationConfig>,
}

/// Aggregate over the trials of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_trials: usize,
    pub invalid_trials: usize,
    /// Whether invalid trials were left out of `statistics`
    pub excluded_invalid: bool,
    pub statistics: Option<SummaryStatistics>,
    /// Why `statistics` is missing
    pub error: Option<String>,
}

impl RunSummary {
    /// Summarize `trials`, optionally dropping the ones flagged invalid
    pub fn from_trials(trials: &[TrialRecord], exclude_invalid: bool) -> Self {
        let invalid_trials = trials.iter().filter(|t| !t.status.is_valid()).count();
        let counts: Vec<u64> = trials
            .iter()
            .filter(|t| !exclude_invalid || t.status.is_valid())
            .map(|t| t.total_count)
            .collect();

        let (statistics, error) = match summarize_counts(&counts) {
            Ok(stats) => (Some(stats), None),
            Err(e) => (None, Some(e.to_string())),
        };

        Self {
            total_trials: trials.len(),
            invalid_trials,
            excluded_invalid: exclude_invalid,
            statistics,
            error,
        }
    }

    /// Statistics as a `Result`, for writers that report either case
    pub fn as_result(&self) -> Result<SummaryStatistics, StatsError> {
        match &self.statistics {
            Some(stats) => Ok(stats.clone()),
            None => {
                let excluded = if self.excluded_invalid {
                    self.invalid_trials
                } else {
                    0
                };
                Err(StatsError::InsufficientSamples {
                    got: self.total_trials - excluded,
                    min: MIN_SUMMARY_SAMPLES,
                })
            }
        }
    }
}

impl RunReport {
    /// Assemble a report stamped with the current time
    pub fn new(
        config: TrialConfig,
        simulation: Option<SimulationConfig>,
        trials: Vec<TrialRecord>,
        exclude_invalid: bool,
    ) -> Self {
        let summary = RunSummary::from_trials(&trials, exclude_invalid);
        Self {
            meta: RunMeta {
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                config,
                simulation,
            },
            trials,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripplecount_core::TrialStatus;

    fn trial(index: usize, total_count: u64, valid: bool) -> TrialRecord {
        TrialRecord {
            index,
            total_count,
            overflow_count: total_count / 16_384,
            pulses: total_count,
            max_slack_us: 0,
            status: if valid {
                TrialStatus::Valid
            } else {
                TrialStatus::Invalid {
                    reason: "late".to_string(),
                }
            },
        }
    }

    #[test]
    fn test_summary_includes_all_by_default() {
        let trials = vec![trial(1, 10, true), trial(2, 20, false), trial(3, 30, true)];
        let summary = RunSummary::from_trials(&trials, false);
        assert_eq!(summary.total_trials, 3);
        assert_eq!(summary.invalid_trials, 1);
        let stats = summary.statistics.unwrap();
        assert!((stats.mean - 20.0).abs() < f64::EPSILON);
        assert!((stats.variance - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_excluding_invalid() {
        let trials = vec![trial(1, 10, true), trial(2, 1000, false), trial(3, 30, true)];
        let summary = RunSummary::from_trials(&trials, true);
        let stats = summary.statistics.unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_trial_has_no_statistics() {
        let summary = RunSummary::from_trials(&[trial(1, 10, true)], false);
        assert!(summary.statistics.is_none());
        assert!(summary.error.as_deref().unwrap().contains("Insufficient samples"));
        assert_eq!(
            summary.as_result(),
            Err(StatsError::InsufficientSamples { got: 1, min: 2 })
        );
    }
}
