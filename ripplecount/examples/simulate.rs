//! ripplecount Library Example
//!
//! Runs a short trial sequence on a simulated counter and prints the trial
//! log followed by the summary, the same output the CLI produces with
//! `--format csv`.
//!
//! Run with:
//!   cargo run --example simulate
//!   RUST_LOG=ripplecount=debug cargo run --example simulate

use ripplecount::prelude::*;
use ripplecount::TrialLogWriter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ripplecount=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // 20 kHz for 2 s: two counter wraps plus change per trial
    let config = TrialConfig {
        clock: ClockSettings::new(20_000, 2_000),
        reset_ms: 10,
        stabilize_ms: 50,
        trials: 5,
    };

    // A drifting gate: every trial stops counting at a slightly different total
    let mut log = TrialLogWriter::new(std::io::stdout().lock())?;
    let mut counts = Vec::new();
    for (i, gate) in [32_868u64, 32_871, 32_866, 32_880, 32_869].into_iter().enumerate() {
        let sim = SimulatedRig::new(&SimulationConfig {
            gate_pulses: Some(gate),
            layout: BusLayout::full(),
            seed: i as u64,
            jitter_us: 2,
            ..Default::default()
        });
        let mut sequencer = TrialSequencer::new(
            TrialConfig {
                trials: 1,
                ..config.clone()
            },
            sim.rig(),
        )?;
        let run = sequencer.run_trial();
        log.record(&TrialRecord {
            index: i + 1,
            total_count: run.total_count,
            overflow_count: run.overflow_count,
            pulses: run.pulses,
            max_slack_us: run.max_slack_us,
            status: ripplecount::TrialStatus::Valid,
        })?;
        counts.push(run.total_count);
    }
    log.summary(&summarize_counts(&counts))?;

    Ok(())
}
