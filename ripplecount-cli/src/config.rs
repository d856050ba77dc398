//! Configuration loading from ripple.toml
//!
//! ripplecount configuration can be specified in a `ripple.toml` file in the
//! working directory or any parent. The configuration is automatically
//! discovered by walking up from the current directory.

use ripplecount_core::{BusLayout, ClockSettings, SimulationConfig, TrialConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name searched for by [`RippleConfig::discover`]
pub const CONFIG_FILE: &str = "ripple.toml";

/// ripplecount configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RippleConfig {
    /// Trial protocol
    #[serde(default)]
    pub trial: TrialSection,
    /// Simulated rig
    #[serde(default)]
    pub simulation: SimulationSection,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
    /// Offline analysis
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Trial protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialSection {
    /// Clock frequency in Hz (at most 50 kHz)
    #[serde(default = "default_frequency")]
    pub frequency_hz: u32,
    /// Clocking duration per trial (e.g., "23s")
    #[serde(default = "default_duration")]
    pub duration: String,
    /// How long reset is held high (e.g., "10ms")
    #[serde(default = "default_reset")]
    pub reset: String,
    /// Wait after releasing reset (e.g., "1s")
    #[serde(default = "default_stabilize")]
    pub stabilize: String,
    /// Number of trials
    #[serde(default = "default_trials")]
    pub trials: usize,
    /// Settling time after each falling edge, in microseconds
    #[serde(default = "default_settle_low_us")]
    pub settle_low_us: u64,
    /// Settling time before the final read (e.g., "100ms")
    #[serde(default = "default_final_settle")]
    pub final_settle: String,
}

impl Default for TrialSection {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency(),
            duration: default_duration(),
            reset: default_reset(),
            stabilize: default_stabilize(),
            trials: default_trials(),
            settle_low_us: default_settle_low_us(),
            final_settle: default_final_settle(),
        }
    }
}

fn default_frequency() -> u32 {
    8192
}
fn default_duration() -> String {
    "23s".to_string()
}
fn default_reset() -> String {
    "10ms".to_string()
}
fn default_stabilize() -> String {
    "1s".to_string()
}
fn default_trials() -> usize {
    100
}
fn default_settle_low_us() -> u64 {
    ripplecount_core::DEFAULT_SETTLE_LOW_US
}
fn default_final_settle() -> String {
    "100ms".to_string()
}

/// Which counter outputs are wired to the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Wiring {
    /// Bits 3-9 and 11-13 (default)
    #[default]
    Reference,
    /// Every bit except 10
    Full,
}

impl Wiring {
    /// Bus layout for this wiring
    pub fn layout(self) -> BusLayout {
        match self {
            Wiring::Reference => BusLayout::reference(),
            Wiring::Full => BusLayout::full(),
        }
    }
}

/// Simulated rig settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSection {
    /// Microseconds of simulated time per clock read
    #[serde(default = "default_poll_cost")]
    pub poll_cost_us: u64,
    /// Random extra microseconds per clock read
    #[serde(default)]
    pub jitter_us: u64,
    /// Jitter seed
    #[serde(default)]
    pub seed: u64,
    /// Stop counting after this many pulses (uncounted gate)
    #[serde(default)]
    pub gate_pulses: Option<u64>,
    /// Counter value after reset is released
    #[serde(default)]
    pub start_offset: u64,
    /// Bus wiring: "reference" or "full"
    #[serde(default)]
    pub wiring: Wiring,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            poll_cost_us: default_poll_cost(),
            jitter_us: 0,
            seed: 0,
            gate_pulses: None,
            start_offset: 0,
            wiring: Wiring::default(),
        }
    }
}

fn default_poll_cost() -> u64 {
    1
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "json", "csv"
    #[serde(default = "default_format")]
    pub format: String,
    /// Trial log file, streamed while trials run
    #[serde(default)]
    pub log_path: Option<String>,
    /// Append to an existing trial log instead of truncating
    #[serde(default)]
    pub append: bool,
    /// Leave trials flagged invalid out of the summary
    #[serde(default)]
    pub exclude_invalid: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            log_path: None,
            append: false,
            exclude_invalid: false,
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}

/// Offline analysis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Moving average window
    #[serde(default = "default_window")]
    pub window: usize,
    /// Quantization step; derived from the wiring when unset
    #[serde(default)]
    pub quantization_step: Option<u64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
            quantization_step: None,
        }
    }
}

fn default_window() -> usize {
    ripplecount_stats::DEFAULT_DETREND_WINDOW
}

impl RippleConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::load(&config_path).ok();
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Resolve the trial section into a protocol configuration
    pub fn trial_config(&self) -> anyhow::Result<TrialConfig> {
        let t = &self.trial;
        Ok(TrialConfig {
            clock: ClockSettings {
                frequency_hz: t.frequency_hz,
                duration_ms: Self::parse_duration_ms(&t.duration)?,
                settle_low_us: t.settle_low_us,
                final_settle_ms: Self::parse_duration_ms(&t.final_settle)?,
            },
            reset_ms: Self::parse_duration_ms(&t.reset)?,
            stabilize_ms: Self::parse_duration_ms(&t.stabilize)?,
            trials: t.trials,
        })
    }

    /// Resolve the simulation section
    pub fn simulation_config(&self) -> SimulationConfig {
        let s = &self.simulation;
        SimulationConfig {
            poll_cost_us: s.poll_cost_us,
            jitter_us: s.jitter_us,
            seed: s.seed,
            gate_pulses: s.gate_pulses,
            start_offset: s.start_offset,
            layout: s.wiring.layout(),
        }
    }

    /// Quantization step for analysis, from config or the wiring's lowest bit
    pub fn quantization_step(&self) -> u64 {
        self.analysis
            .quantization_step
            .unwrap_or_else(|| self.simulation.wiring.layout().quantization_step())
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# ripplecount Configuration

[trial]
# Clock frequency in Hz (at most 50000)
frequency_hz = 8192
# Clocking time per trial; must cover at least one counter wrap
duration = "23s"
# Reset pulse width
reset = "10ms"
# Wait after reset before clocking
stabilize = "1s"
# Number of trials
trials = 100
# Settling time after each falling edge (microseconds)
settle_low_us = 2
# Settling time before the final bus read
final_settle = "100ms"

[simulation]
# Simulated microseconds per clock read
poll_cost_us = 1
# Random extra microseconds per clock read
jitter_us = 0
seed = 0
# Stop counting after N pulses (uncomment to enable)
# gate_pulses = 32868
# Counter value after reset
start_offset = 0
# Bus wiring: "reference" (bits 3-9, 11-13) or "full"
wiring = "reference"

[output]
# Default output format: human, json, csv
format = "human"
# Stream the trial log to a file (uncomment to enable)
# log_path = "ticks.csv"
# Append to an existing log
append = false
# Leave invalid trials out of the summary
exclude_invalid = false

[analysis]
# Moving average window for detrending
window = 40
# Quantization step (defaults to the lowest wired bit, uncomment to override)
# quantization_step = 8
"#
        .to_string()
    }

    /// Parse duration string (e.g., "23s", "500ms", "2m") to microseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if value < 0.0 {
            return Err(anyhow::anyhow!("Negative duration: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "us" | "µs" => 1,
            "ms" => 1_000,
            "s" | "" => 1_000_000,
            "m" | "min" => 60_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }

    /// Parse duration string to whole milliseconds
    pub fn parse_duration_ms(s: &str) -> anyhow::Result<u64> {
        Ok(Self::parse_duration(s)? / 1_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RippleConfig::default();
        assert_eq!(config.trial.frequency_hz, 8192);
        assert_eq!(config.trial.duration, "23s");
        assert_eq!(config.simulation.wiring, Wiring::Reference);
        assert!(!config.output.append);
        assert_eq!(config.quantization_step(), 8);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(RippleConfig::parse_duration("23s").unwrap(), 23_000_000);
        assert_eq!(RippleConfig::parse_duration("500ms").unwrap(), 500_000);
        assert_eq!(RippleConfig::parse_duration("100us").unwrap(), 100);
        assert_eq!(RippleConfig::parse_duration("2m").unwrap(), 120_000_000);
        assert_eq!(RippleConfig::parse_duration("1.5s").unwrap(), 1_500_000);
        assert_eq!(RippleConfig::parse_duration("4").unwrap(), 4_000_000);
        assert_eq!(RippleConfig::parse_duration_ms("10ms").unwrap(), 10);
        assert!(RippleConfig::parse_duration("").is_err());
        assert!(RippleConfig::parse_duration("3h").is_err());
        assert!(RippleConfig::parse_duration("-1s").is_err());
    }

    #[test]
    fn test_trial_config_matches_reference() {
        let config = RippleConfig::default().trial_config().unwrap();
        assert_eq!(config, TrialConfig::default());
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
            [trial]
            frequency_hz = 20000
            duration = "2s"
            trials = 5

            [simulation]
            wiring = "full"
            gate_pulses = 100
        "#;

        let config: RippleConfig = toml::from_str(toml_str).unwrap();
        let trial = config.trial_config().unwrap();
        assert_eq!(trial.clock.frequency_hz, 20_000);
        assert_eq!(trial.clock.duration_ms, 2_000);
        assert_eq!(trial.trials, 5);
        // Defaults should still apply
        assert_eq!(trial.reset_ms, 10);
        assert_eq!(config.output.format, "human");

        let sim = config.simulation_config();
        assert_eq!(sim.gate_pulses, Some(100));
        assert_eq!(sim.layout, BusLayout::full());
        assert_eq!(config.quantization_step(), 1);
    }

    #[test]
    fn test_default_toml_parses() {
        let default_toml = RippleConfig::default_toml();
        let config: RippleConfig = toml::from_str(&default_toml).unwrap();
        assert_eq!(config.trial.duration, "23s");
        assert_eq!(config.analysis.window, 40);
        assert_eq!(
            config.trial_config().unwrap(),
            RippleConfig::default().trial_config().unwrap()
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[trial]\ntrials = 3\n").unwrap();
        let config = RippleConfig::load(&path).unwrap();
        assert_eq!(config.trial.trials, 3);
    }
}
