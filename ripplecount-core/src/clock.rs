//! Clock Generation
//!
//! Bit-bangs a square wave on the clock line and samples the counter bus on
//! every rising edge.
//!
//! ## Timing model
//!
//! ```text
//!            ┌───────┐       ┌───────┐
//! clock   ───┘       └───────┘       └───
//!            ▲       ▲               ▲
//!            │       │               └ deadline += half_period (never now + half_period)
//!            │       └ low: settle spin (2 µs), deadline untouched
//!            └ high: pulse++, sample MSB + bit 9, update tracker
//! ```
//!
//! Toggle deadlines come from a free-running accumulator, so scheduling slack
//! delays individual edges but never accumulates into phase drift.

use crate::bus::BusReading;
use crate::hal::{DigitalInput, DigitalOutput, Rig, TimeSource, spin_wait_ms, spin_wait_us};
use crate::tracker::TrackerState;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settle spin after every falling edge (microseconds)
pub const DEFAULT_SETTLE_LOW_US: u64 = 2;

/// Settle spin between stopping the clock and the final read (milliseconds)
pub const DEFAULT_FINAL_SETTLE_MS: u64 = 100;

/// Clock generator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSettings {
    /// Target clock frequency in Hz
    pub frequency_hz: u32,
    /// Run duration in milliseconds
    pub duration_ms: u64,
    /// Settle spin after each falling edge, in microseconds
    pub settle_low_us: u64,
    /// Settle spin before the final read, in milliseconds
    pub final_settle_ms: u64,
}

impl ClockSettings {
    /// Settings with the reference settle delays
    pub fn new(frequency_hz: u32, duration_ms: u64) -> Self {
        Self {
            frequency_hz,
            duration_ms,
            settle_low_us: DEFAULT_SETTLE_LOW_US,
            final_settle_ms: DEFAULT_FINAL_SETTLE_MS,
        }
    }

    /// `(1_000_000 / frequency) / 2` in whole microseconds
    pub fn half_period_us(&self) -> u64 {
        if self.frequency_hz == 0 {
            return 0;
        }
        (1_000_000 / self.frequency_hz as u64) / 2
    }
}

/// Free-running toggle deadline
///
/// The single "advance to next edge" operation of the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSchedule {
    last_toggle_us: u64,
    half_period_us: u64,
}

impl EdgeSchedule {
    /// Schedule whose first edge is due one half period after `start_us`
    pub fn new(start_us: u64, half_period_us: u64) -> Self {
        Self {
            last_toggle_us: start_us,
            half_period_us,
        }
    }

    /// Check the deadline against `now_us`.
    ///
    /// Returns the lateness in microseconds when an edge is due, advancing the
    /// deadline by exactly one half period; `None` otherwise.
    #[inline]
    pub fn poll(&mut self, now_us: u64) -> Option<u64> {
        let elapsed = now_us.wrapping_sub(self.last_toggle_us);
        if elapsed >= self.half_period_us {
            self.last_toggle_us = self.last_toggle_us.wrapping_add(self.half_period_us);
            Some(elapsed - self.half_period_us)
        } else {
            None
        }
    }

    /// Half period in microseconds
    pub fn half_period_us(&self) -> u64 {
        self.half_period_us
    }
}

/// Generator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockPhase {
    /// Not started
    Idle,
    /// Toggling the clock line
    Running,
    /// Clock forced low, final reading taken
    Stopped,
}

/// Everything one generator run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockRun {
    /// `overflow_count * 16384 + final_reading`
    pub total_count: u64,
    /// Full counter wraps detected while running
    pub overflow_count: u64,
    /// Inferred bit 10 at the end of the run
    pub reconstructed_bit10: bool,
    /// Final bus reading with bit 10 already overridden
    pub final_reading: BusReading,
    /// Rising edges generated
    pub pulses: u64,
    /// Worst lateness of any toggle against its deadline, in microseconds
    pub max_slack_us: u64,
}

/// Square-wave generator with overflow tracking
#[derive(Debug)]
pub struct ClockGenerator {
    settings: ClockSettings,
    phase: ClockPhase,
}

impl ClockGenerator {
    /// Create an idle generator
    pub fn new(settings: ClockSettings) -> Self {
        Self {
            settings,
            phase: ClockPhase::Idle,
        }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    /// Generator settings
    pub fn settings(&self) -> &ClockSettings {
        &self.settings
    }

    /// Run the clock for the configured duration and compute the total.
    ///
    /// Consumes the per-trial `state`; it must already be seeded from the bus.
    /// The clock line is low when this returns.
    pub fn run<O, I, T>(&mut self, rig: &mut Rig<O, I, T>, mut state: TrackerState) -> ClockRun
    where
        O: DigitalOutput,
        I: DigitalInput,
        T: TimeSource,
    {
        let settings = &self.settings;
        let mut schedule = EdgeSchedule::new(rig.time.micros(), settings.half_period_us());
        let start_ms = rig.time.millis();
        let mut level = false;
        let mut max_slack_us = 0;

        self.phase = ClockPhase::Running;
        rig.clock.write(false);
        debug!(
            frequency_hz = settings.frequency_hz,
            half_period_us = schedule.half_period_us(),
            duration_ms = settings.duration_ms,
            "clock running"
        );

        while rig.time.millis().wrapping_sub(start_ms) < settings.duration_ms {
            let Some(slack) = schedule.poll(rig.time.micros()) else {
                continue;
            };
            max_slack_us = max_slack_us.max(slack);
            level = !level;
            rig.clock.write(level);

            if level {
                state.observe(rig.bus.sample_tracked());
            } else {
                spin_wait_us(&mut rig.time, settings.settle_low_us);
            }
        }

        rig.clock.write(false);
        self.phase = ClockPhase::Stopped;

        spin_wait_ms(&mut rig.time, settings.final_settle_ms);
        let reading = rig.bus.sample();
        state.settle(reading);
        let final_reading = state.finalize_reading(reading);
        let total_count = state.total_count(final_reading);

        debug!(
            pulses = state.pulses(),
            overflows = state.overflow_count(),
            final_reading = final_reading.value(),
            max_slack_us,
            "clock stopped"
        );

        ClockRun {
            total_count,
            overflow_count: state.overflow_count(),
            reconstructed_bit10: state.reconstructed_bit10(),
            final_reading,
            pulses: state.pulses(),
            max_slack_us,
        }
    }
}
