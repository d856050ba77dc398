//! Simulated Hardware
//!
//! A software ripple counter and fake time source implementing the
//! [`crate::hal`] traits, so the full trial protocol can run on a host
//! without GPIO.
//!
//! The counter advances on each falling edge of the clock line (like a
//! 74HC4020) and is held at zero while reset is high. Simulated time only
//! moves when it is read, by `poll_cost_us` plus optional seeded jitter, so
//! every spin-poll terminates and a given seed always replays the same run.

use crate::bus::{BusLayout, BusLine, BusSampler, COUNTER_WRAP};
use crate::hal::{DigitalInput, DigitalOutput, Rig, TimeSource};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// Simulated rig parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Microseconds that pass on every time read
    pub poll_cost_us: u64,
    /// Extra random microseconds per time read, `0..=jitter_us`
    pub jitter_us: u64,
    /// Jitter seed
    pub seed: u64,
    /// Stop counting after this many pulses per reset (gated input)
    pub gate_pulses: Option<u64>,
    /// Counter value right after reset is released
    pub start_offset: u64,
    /// Wired bus bits
    pub layout: BusLayout,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            poll_cost_us: 1,
            jitter_us: 0,
            seed: 0,
            gate_pulses: None,
            start_offset: 0,
            layout: BusLayout::reference(),
        }
    }
}

#[derive(Debug)]
struct RigState {
    now_us: u64,
    rng: StdRng,
    poll_cost_us: u64,
    jitter_us: u64,
    gate_pulses: Option<u64>,
    start_offset: u64,
    counter: u64,
    counted: u64,
    clock_high: bool,
    reset_high: bool,
    clock_edges: u64,
}

impl RigState {
    fn advance(&mut self) -> u64 {
        let jitter = if self.jitter_us > 0 {
            self.rng.gen_range(0..=self.jitter_us)
        } else {
            0
        };
        self.now_us = self.now_us.wrapping_add(self.poll_cost_us + jitter);
        self.now_us
    }

    fn set_clock(&mut self, level: bool) {
        let falling = self.clock_high && !level;
        if level != self.clock_high {
            self.clock_edges += 1;
        }
        self.clock_high = level;

        let gated = self.gate_pulses.is_some_and(|g| self.counted >= g);
        if falling && !self.reset_high && !gated {
            self.counter = (self.counter + 1) % COUNTER_WRAP;
            self.counted += 1;
        }
    }

    fn set_reset(&mut self, level: bool) {
        if level {
            self.counter = 0;
            self.counted = 0;
        } else if self.reset_high {
            self.counter = self.start_offset % COUNTER_WRAP;
        }
        self.reset_high = level;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    Reset,
    Clock,
}

/// Output line handle into a [`SimulatedRig`]
#[derive(Debug, Clone)]
pub struct SimOutput {
    kind: OutputKind,
    state: Rc<RefCell<RigState>>,
}

impl DigitalOutput for SimOutput {
    fn write(&mut self, level: bool) {
        let mut state = self.state.borrow_mut();
        match self.kind {
            OutputKind::Reset => state.set_reset(level),
            OutputKind::Clock => state.set_clock(level),
        }
    }
}

/// Input line handle for one counter bit
#[derive(Debug, Clone)]
pub struct SimInput {
    bit: u8,
    state: Rc<RefCell<RigState>>,
}

impl DigitalInput for SimInput {
    fn read(&mut self) -> bool {
        (self.state.borrow().counter >> self.bit) & 1 == 1
    }
}

/// Time source handle
#[derive(Debug, Clone)]
pub struct SimTime {
    state: Rc<RefCell<RigState>>,
}

impl TimeSource for SimTime {
    fn millis(&mut self) -> u64 {
        self.state.borrow_mut().advance() / 1000
    }

    fn micros(&mut self) -> u64 {
        self.state.borrow_mut().advance()
    }
}

/// A simulated ripple counter wired to a software clock
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    state: Rc<RefCell<RigState>>,
    layout: BusLayout,
}

impl SimulatedRig {
    /// Build a rig from `config`; the counter starts at zero with both lines low
    pub fn new(config: &SimulationConfig) -> Self {
        let state = RigState {
            now_us: 0,
            rng: StdRng::seed_from_u64(config.seed),
            poll_cost_us: config.poll_cost_us.max(1),
            jitter_us: config.jitter_us,
            gate_pulses: config.gate_pulses,
            start_offset: config.start_offset,
            counter: 0,
            counted: 0,
            clock_high: false,
            reset_high: false,
            clock_edges: 0,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
            layout: config.layout.clone(),
        }
    }

    /// Collaborator handles for the trial sequencer
    pub fn rig(&self) -> Rig<SimOutput, SimInput, SimTime> {
        self.rig_with_time(SimTime {
            state: Rc::clone(&self.state),
        })
    }

    /// Simulated lines paced by an external clock such as [`crate::HostTime`]
    pub fn rig_with_time<T: TimeSource>(&self, time: T) -> Rig<SimOutput, SimInput, T> {
        let lines = self
            .layout
            .bits()
            .iter()
            .map(|&bit| {
                let input = SimInput {
                    bit,
                    state: Rc::clone(&self.state),
                };
                BusLine::new(format!("Q{}", bit + 1), bit, input)
            })
            .collect();

        Rig {
            reset: SimOutput {
                kind: OutputKind::Reset,
                state: Rc::clone(&self.state),
            },
            clock: SimOutput {
                kind: OutputKind::Clock,
                state: Rc::clone(&self.state),
            },
            bus: BusSampler::new(lines),
            time,
        }
    }

    /// Current 14-bit counter value
    pub fn counter(&self) -> u64 {
        self.state.borrow().counter
    }

    /// Pulses counted since the last reset
    pub fn counted(&self) -> u64 {
        self.state.borrow().counted
    }

    /// Clock line transitions seen so far
    pub fn clock_edges(&self) -> u64 {
        self.state.borrow().clock_edges
    }

    /// Whether the clock line is currently high
    pub fn clock_high(&self) -> bool {
        self.state.borrow().clock_high
    }

    /// Simulated time in microseconds
    pub fn now_us(&self) -> u64 {
        self.state.borrow().now_us
    }
}

/// Deterministic time source for unit tests.
///
/// Advances by a fixed step on every read.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedTime {
    now_us: u64,
    step_us: u64,
}

impl ScriptedTime {
    /// Start at `start_us`, advancing `step_us` per read
    pub fn new(start_us: u64, step_us: u64) -> Self {
        Self { now_us: start_us, step_us }
    }

    /// Current time without advancing
    pub fn peek(&self) -> u64 {
        self.now_us
    }
}

impl TimeSource for ScriptedTime {
    fn millis(&mut self) -> u64 {
        self.now_us = self.now_us.wrapping_add(self.step_us);
        self.now_us / 1000
    }

    fn micros(&mut self) -> u64 {
        self.now_us = self.now_us.wrapping_add(self.step_us);
        self.now_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_falling_edges() {
        let sim = SimulatedRig::new(&SimulationConfig::default());
        let mut rig = sim.rig();
        for _ in 0..5 {
            rig.clock.write(true);
            rig.clock.write(false);
        }
        assert_eq!(sim.counter(), 5);
        assert_eq!(sim.clock_edges(), 10);
        // Rising edge alone does not count
        rig.clock.write(true);
        assert_eq!(sim.counter(), 5);
    }

    #[test]
    fn test_reset_holds_zero() {
        let config = SimulationConfig {
            start_offset: 40,
            ..Default::default()
        };
        let sim = SimulatedRig::new(&config);
        let mut rig = sim.rig();
        rig.clock.write(true);
        rig.clock.write(false);
        rig.reset.write(true);
        assert_eq!(sim.counter(), 0);
        rig.clock.write(true);
        rig.clock.write(false);
        assert_eq!(sim.counter(), 0);
        rig.reset.write(false);
        assert_eq!(sim.counter(), 40);
    }

    #[test]
    fn test_gate_stops_counting() {
        let config = SimulationConfig {
            gate_pulses: Some(3),
            ..Default::default()
        };
        let sim = SimulatedRig::new(&config);
        let mut rig = sim.rig();
        for _ in 0..10 {
            rig.clock.write(true);
            rig.clock.write(false);
        }
        assert_eq!(sim.counted(), 3);
    }

    #[test]
    fn test_bus_reflects_counter() {
        let config = SimulationConfig {
            layout: BusLayout::full(),
            ..Default::default()
        };
        let sim = SimulatedRig::new(&config);
        let mut rig = sim.rig();
        for _ in 0..0b1011 {
            rig.clock.write(true);
            rig.clock.write(false);
        }
        assert_eq!(rig.bus.sample().value(), 0b1011);

        // Reference wiring drops the three low bits
        let sim = SimulatedRig::new(&SimulationConfig::default());
        let mut rig = sim.rig();
        for _ in 0..0b1011 {
            rig.clock.write(true);
            rig.clock.write(false);
        }
        assert_eq!(rig.bus.sample().value(), 0b1000);
    }

    #[test]
    fn test_time_advances_per_read() {
        let sim = SimulatedRig::new(&SimulationConfig::default());
        let mut rig = sim.rig();
        let a = rig.time.micros();
        let b = rig.time.micros();
        assert_eq!(b - a, 1);
    }

    #[test]
    fn test_external_time_source() {
        let sim = SimulatedRig::new(&SimulationConfig::default());
        let mut rig = sim.rig_with_time(ScriptedTime::new(0, 10));
        assert_eq!(rig.time.micros(), 10);
        rig.clock.write(true);
        rig.clock.write(false);
        assert_eq!(sim.counter(), 1);
        // The shared simulated clock is never read
        assert_eq!(sim.now_us(), 0);
    }

    #[test]
    fn test_jitter_is_seeded() {
        let config = SimulationConfig {
            jitter_us: 5,
            seed: 42,
            ..Default::default()
        };
        let reads = |config: &SimulationConfig| {
            let sim = SimulatedRig::new(config);
            let mut rig = sim.rig();
            (0..100).map(|_| rig.time.micros()).collect::<Vec<_>>()
        };
        assert_eq!(reads(&config), reads(&config));
    }

    #[test]
    fn test_scripted_time() {
        let mut time = ScriptedTime::new(0, 250);
        assert_eq!(time.micros(), 250);
        assert_eq!(time.millis(), 0);
        assert_eq!(time.millis(), 1);
        assert_eq!(time.peek(), 1000);
    }
}
