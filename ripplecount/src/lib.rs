#![warn(missing_docs)]
//! # ripplecount
//!
//! Counts pulses of a software-generated clock through an external 14-bit
//! ripple counter, reconstructing totals far beyond the counter's range.
//!
//! - **Clock generation**: a bit-banged square wave with drift-free toggle
//!   deadlines and per-trial lateness tracking
//! - **Overflow detection**: MSB falling edges counted on every rising clock
//!   edge, so wraps are never missed even with a sparse bus
//! - **Bit reconstruction**: an unwired counter bit inferred from the bit
//!   below it
//! - **Trial sequencing**: reset, stabilize, count and read, repeated with no
//!   state carried between trials
//! - **Statistics**: mean, sample variance and the mean/variance ratio, plus
//!   offline detrending of a trial log
//!
//! ## Quick Start
//!
//! ```ignore
//! use ripplecount::prelude::*;
//!
//! let sim = SimulatedRig::new(&SimulationConfig::default());
//! let mut sequencer = TrialSequencer::new(TrialConfig::default(), sim.rig())?;
//! let records = sequencer.run(|r| println!("{},{}", r.index, r.total_count));
//! let counts: Vec<u64> = records.iter().map(|r| r.total_count).collect();
//! let summary = summarize_counts(&counts)?;
//! ```
//!
//! ## Real hardware
//!
//! Implement [`DigitalOutput`], [`DigitalInput`] and [`TimeSource`] for the
//! board's GPIO and timer, build a [`Rig`], and hand it to
//! [`TrialSequencer::new`].

// Re-export core types
pub use ripplecount_core::{
    BusLayout, BusLine, BusReading, BusSampler, COUNTER_BITS, COUNTER_WRAP, ClockGenerator,
    ClockPhase, ClockRun, ClockSettings, ConfigError, DigitalInput, DigitalOutput, EdgeDetector,
    EdgeSchedule, HostTime, MAX_FREQUENCY_HZ, MID_BIT, MSB_BIT, RECONSTRUCTED_BIT, Rig,
    ScriptedTime, SimulatedRig, SimulationConfig, TimeSource, TrackerState, TrialConfig,
    TrialRecord, TrialSequencer, TrialStatus, pin_to_cpu,
};

// Re-export stats
pub use ripplecount_stats::{
    DetrendAnalysis, SeriesAnalysis, StatsError, SummaryStatistics, detrend, mean,
    moving_average, std_dev, summarize, summarize_counts, variance,
};

// Re-export reporting
pub use ripplecount_report::{
    LogError, LogRow, OutputFormat, RunReport, TrialLogWriter, generate_json_report,
    read_trial_log,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BusLayout, ClockSettings, SimulatedRig, SimulationConfig, TrialConfig, TrialRecord,
        TrialSequencer, summarize_counts,
    };
}

/// Run the ripplecount CLI.
///
/// Call this from a binary's `main()`:
/// ```ignore
/// fn main() -> anyhow::Result<()> {
///     ripplecount::run()
/// }
/// ```
pub use ripplecount_cli::run;
