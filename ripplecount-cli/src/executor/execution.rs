//! Trial Execution
//!
//! Runs the trial sequence on a simulated rig and streams each record to the
//! trial log as soon as it completes.
//!
//! ## Time sources
//!
//! - **Simulated (default)**: the rig's own clock advances a fixed cost per
//!   read. Deterministic for a given seed, and much faster than real time.
//!
//! - **Realtime**: the simulated counter is paced by [`HostTime`], so the
//!   recorded slack reflects how well this host keeps the clock in phase.
//!
//! ## Data Flow
//!
//! ```text
//!   ExecutionConfig
//!        │
//!        ▼
//! ┌──────────────────┐
//! │  TrialSequencer  │  reset → stabilize → count → read, per trial
//! └────────┬─────────┘
//!          │ on_trial
//!          ├──────────────▶ TrialLogWriter (one flushed line per trial)
//!          ▼
//!     RunReport (records + summary)
//! ```

use indicatif::{ProgressBar, ProgressStyle};
use ripplecount_core::{
    DigitalInput, DigitalOutput, HostTime, Rig, SimulatedRig, SimulationConfig, TimeSource,
    TrialConfig, TrialRecord, TrialSequencer, pin_to_cpu,
};
use ripplecount_report::{RunReport, TrialLogWriter};
use std::io::Write;
use tracing::{info, warn};

/// Configuration for a trial run
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Trial protocol
    pub trial: TrialConfig,
    /// Simulated rig parameters
    pub simulation: SimulationConfig,
    /// Pace the simulated rig with the host clock
    pub realtime: bool,
    /// Pin the trial loop to this CPU
    pub cpu: Option<usize>,
    /// Leave invalid trials out of the summary
    pub exclude_invalid: bool,
    /// Draw a progress bar on stderr
    pub show_progress: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            trial: TrialConfig::default(),
            simulation: SimulationConfig::default(),
            realtime: false,
            cpu: None,
            exclude_invalid: false,
            show_progress: true,
        }
    }
}

/// Runs a configured trial sequence
pub struct Executor {
    config: ExecutionConfig,
}

impl Executor {
    /// Create a new executor
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Run every trial, streaming rows to `log` and finishing it with the
    /// summary footer
    pub fn execute<W: Write>(
        &self,
        mut log: Option<&mut TrialLogWriter<W>>,
    ) -> anyhow::Result<RunReport> {
        self.config.trial.validate()?;

        if let Some(cpu) = self.config.cpu {
            match pin_to_cpu(cpu) {
                Ok(()) => info!(cpu, "pinned trial loop"),
                Err(e) => warn!(cpu, error = %e, "failed to pin trial loop"),
            }
        }

        let sim = SimulatedRig::new(&self.config.simulation);
        let trials = if self.config.realtime {
            self.run_on(sim.rig_with_time(HostTime::new()), log.as_deref_mut())?
        } else {
            self.run_on(sim.rig(), log.as_deref_mut())?
        };

        let simulation = if self.config.realtime {
            None
        } else {
            Some(self.config.simulation.clone())
        };
        let report = RunReport::new(
            self.config.trial.clone(),
            simulation,
            trials,
            self.config.exclude_invalid,
        );

        if let Some(log) = log {
            log.summary(&report.summary.as_result())?;
        }

        Ok(report)
    }

    fn run_on<O, I, T, W>(
        &self,
        rig: Rig<O, I, T>,
        mut log: Option<&mut TrialLogWriter<W>>,
    ) -> anyhow::Result<Vec<TrialRecord>>
    where
        O: DigitalOutput,
        I: DigitalInput,
        T: TimeSource,
        W: Write,
    {
        let mut sequencer = TrialSequencer::new(self.config.trial.clone(), rig)?;

        let pb = if self.config.show_progress {
            ProgressBar::new(self.config.trial.trials as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(format!("{} Hz", self.config.trial.clock.frequency_hz));

        // The sequencer callback cannot fail; the first write error stops
        // logging and is returned once the sequence ends
        let mut log_error = None;
        let records = sequencer.run(|record| {
            if log_error.is_none() {
                if let Some(log) = log.as_deref_mut() {
                    if let Err(e) = log.record(record) {
                        log_error = Some(e);
                    }
                }
            }
            pb.set_message(format!("n_ticks {}", record.total_count));
            pb.inc(1);
        });
        pb.finish_with_message("Complete");

        if let Some(e) = log_error {
            return Err(e.into());
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripplecount_core::{BusLayout, ClockSettings};
    use ripplecount_report::read_trial_log;
    use std::io::Cursor;

    fn quick(trials: usize, gate_pulses: u64) -> ExecutionConfig {
        ExecutionConfig {
            trial: TrialConfig {
                clock: ClockSettings {
                    frequency_hz: 50_000,
                    duration_ms: 400,
                    settle_low_us: 2,
                    final_settle_ms: 5,
                },
                reset_ms: 1,
                stabilize_ms: 2,
                trials,
            },
            simulation: SimulationConfig {
                gate_pulses: Some(gate_pulses),
                layout: BusLayout::full(),
                ..Default::default()
            },
            show_progress: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_execute_streams_log() {
        let executor = Executor::new(quick(3, 17_000));
        let mut log = TrialLogWriter::new(Vec::new()).unwrap();
        let report = executor.execute(Some(&mut log)).unwrap();

        assert_eq!(report.trials.len(), 3);
        let stats = report.summary.statistics.as_ref().unwrap();
        assert!((stats.mean - 17_000.0).abs() < f64::EPSILON);

        let text = log.into_inner();
        let rows = read_trial_log(Cursor::new(&text)).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.n_ticks == 17_000));
        assert!(String::from_utf8(text).unwrap().contains("# mean: 17000.0000"));
    }

    #[test]
    fn test_execute_without_log() {
        let executor = Executor::new(quick(1, 500));
        let report = executor.execute::<Vec<u8>>(None).unwrap();
        assert_eq!(report.trials[0].total_count, 500);
        assert!(report.summary.statistics.is_none());
        assert!(report.meta.simulation.is_some());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = quick(1, 500);
        config.trial.clock.frequency_hz = 0;
        let executor = Executor::new(config);
        assert!(executor.execute::<Vec<u8>>(None).is_err());
    }
}
