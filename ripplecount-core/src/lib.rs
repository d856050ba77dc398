#![warn(missing_docs)]
//! ripplecount Core - Measurement Runtime
//!
//! This crate provides the measurement primitive:
//! - `hal` traits for digital lines and a monotonic time source
//! - `BusSampler` packing counter outputs into a `BusReading`
//! - `ClockGenerator` bit-banging the clock and tracking overflows
//! - `TrialSequencer` running reset → stabilize → count → read per trial
//! - `SimulatedRig` standing in for GPIO on a host

pub mod hal;

mod bus;
mod clock;
mod measure;
mod sequencer;
mod sim;
mod tracker;

pub use bus::{
    BusLayout, BusLine, BusReading, BusSampler, COUNTER_BITS, COUNTER_WRAP, MID_BIT, MSB_BIT,
    RECONSTRUCTED_BIT,
};
pub use clock::{
    ClockGenerator, ClockPhase, ClockRun, ClockSettings, DEFAULT_FINAL_SETTLE_MS,
    DEFAULT_SETTLE_LOW_US, EdgeSchedule,
};
pub use hal::{DigitalInput, DigitalOutput, Rig, TimeSource};
pub use measure::{HostTime, pin_to_cpu};
pub use sequencer::{
    ConfigError, MAX_FREQUENCY_HZ, TrialConfig, TrialRecord, TrialSequencer, TrialStatus,
};
pub use sim::{ScriptedTime, SimInput, SimOutput, SimTime, SimulatedRig, SimulationConfig};
pub use tracker::{EdgeDetector, TrackerState};
