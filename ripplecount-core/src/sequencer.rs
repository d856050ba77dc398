//! Trial Sequencing
//!
//! Runs the reset → stabilize → count → read protocol once per trial, strictly
//! one trial after another. Nothing but configuration survives a trial
//! boundary: each trial gets a fresh [`TrackerState`] seeded from the bus.

use crate::bus::COUNTER_WRAP;
use crate::clock::{ClockGenerator, ClockRun, ClockSettings};
use crate::hal::{DigitalInput, DigitalOutput, Rig, TimeSource, spin_wait_ms};
use crate::tracker::TrackerState;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Highest clock frequency the polling loop is trusted to keep in phase
pub const MAX_FREQUENCY_HZ: u32 = 50_000;

/// Trial protocol configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Clock generator settings
    pub clock: ClockSettings,
    /// How long reset is held high, in milliseconds
    pub reset_ms: u64,
    /// Wait after releasing reset, in milliseconds
    pub stabilize_ms: u64,
    /// Number of trials to run
    pub trials: usize,
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            clock: ClockSettings::new(8192, 23_000),
            reset_ms: 10,
            stabilize_ms: 1000,
            trials: 100,
        }
    }
}

/// Rejected configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Clock frequency must be non-zero")]
    ZeroFrequency,

    #[error("Clock frequency {got} Hz exceeds the {max} Hz polling ceiling")]
    FrequencyTooHigh { got: u32, max: u32 },

    #[error("Trial duration {duration_ms} ms yields ~{expected_pulses} pulses at {frequency_hz} Hz; at least {min} are needed to observe an overflow")]
    DurationTooShort {
        duration_ms: u64,
        frequency_hz: u32,
        expected_pulses: u64,
        min: u64,
    },

    #[error("Trial count must be at least 1")]
    NoTrials,
}

impl TrialConfig {
    /// Check the configuration before any trial starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        let frequency_hz = self.clock.frequency_hz;
        if frequency_hz == 0 {
            return Err(ConfigError::ZeroFrequency);
        }
        if frequency_hz > MAX_FREQUENCY_HZ {
            return Err(ConfigError::FrequencyTooHigh {
                got: frequency_hz,
                max: MAX_FREQUENCY_HZ,
            });
        }

        let expected_pulses =
            u64::from(frequency_hz).saturating_mul(self.clock.duration_ms) / 1000;
        if expected_pulses < COUNTER_WRAP {
            return Err(ConfigError::DurationTooShort {
                duration_ms: self.clock.duration_ms,
                frequency_hz,
                expected_pulses,
                min: COUNTER_WRAP,
            });
        }

        if self.trials == 0 {
            return Err(ConfigError::NoTrials);
        }
        Ok(())
    }
}

/// Whether a trial's clock stayed on schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TrialStatus {
    /// Every toggle landed within one half period of its deadline
    Valid,
    /// The run is suspect; kept for the reporting layer to decide
    Invalid {
        /// Human-readable cause
        reason: String,
    },
}

impl TrialStatus {
    /// Whether the trial is flagged valid
    pub fn is_valid(&self) -> bool {
        matches!(self, TrialStatus::Valid)
    }
}

/// One completed trial
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// 1-based trial index
    pub index: usize,
    /// Reconstructed pulse total
    pub total_count: u64,
    /// Full counter wraps detected
    pub overflow_count: u64,
    /// Rising edges generated
    pub pulses: u64,
    /// Worst toggle lateness in microseconds
    pub max_slack_us: u64,
    /// Validity flag
    #[serde(flatten)]
    pub status: TrialStatus,
}

/// Drives trials on an exclusively borrowed rig
pub struct TrialSequencer<O, I, T> {
    config: TrialConfig,
    rig: Rig<O, I, T>,
}

impl<O, I, T> TrialSequencer<O, I, T>
where
    O: DigitalOutput,
    I: DigitalInput,
    T: TimeSource,
{
    /// Validate `config` and take ownership of the rig
    pub fn new(config: TrialConfig, rig: Rig<O, I, T>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, rig })
    }

    /// Trial configuration
    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Release the rig
    pub fn into_rig(self) -> Rig<O, I, T> {
        self.rig
    }

    /// Run one full reset → stabilize → count → read cycle
    pub fn run_trial(&mut self) -> ClockRun {
        let rig = &mut self.rig;

        debug!(reset_ms = self.config.reset_ms, "asserting reset");
        rig.reset.write(true);
        spin_wait_ms(&mut rig.time, self.config.reset_ms);
        rig.reset.write(false);

        spin_wait_ms(&mut rig.time, self.config.stabilize_ms);

        let state = TrackerState::seeded(rig.bus.sample_tracked());
        let mut generator = ClockGenerator::new(self.config.clock.clone());
        generator.run(rig, state)
    }

    /// Run the configured number of trials, calling `on_trial` after each
    pub fn run<F>(&mut self, mut on_trial: F) -> Vec<TrialRecord>
    where
        F: FnMut(&TrialRecord),
    {
        let half_period_us = self.config.clock.half_period_us();
        let mut records = Vec::with_capacity(self.config.trials);

        for index in 1..=self.config.trials {
            let run = self.run_trial();

            let status = if run.max_slack_us > half_period_us {
                TrialStatus::Invalid {
                    reason: format!(
                        "toggle ran {} us late (half period {} us)",
                        run.max_slack_us, half_period_us
                    ),
                }
            } else {
                TrialStatus::Valid
            };

            let record = TrialRecord {
                index,
                total_count: run.total_count,
                overflow_count: run.overflow_count,
                pulses: run.pulses,
                max_slack_us: run.max_slack_us,
                status,
            };

            match &record.status {
                TrialStatus::Valid => info!(
                    trial = index,
                    total = record.total_count,
                    overflows = record.overflow_count,
                    "trial complete"
                ),
                TrialStatus::Invalid { reason } => warn!(
                    trial = index,
                    total = record.total_count,
                    %reason,
                    "trial flagged invalid"
                ),
            }

            on_trial(&record);
            records.push(record);
        }

        records
    }
}
