#![warn(missing_docs)]
//! ripplecount CLI Library
//!
//! Command line front end for running counting trials and analyzing their
//! logs. Use `ripplecount::run()` (or `ripplecount_cli::run()`) in a main
//! function to get the full CLI.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> anyhow::Result<()> {
//!     ripplecount_cli::run()
//! }
//! ```

mod config;
mod executor;

pub use config::*;
pub use executor::{
    ExecutionConfig, Executor, analyze_log, analyze_rows, format_analysis, format_human_output,
};

use clap::{Parser, Subcommand};
use ripplecount_report::{OutputFormat, TrialLogWriter, generate_json_report};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// ripplecount CLI arguments
#[derive(Parser, Debug)]
#[command(name = "ripplecount")]
#[command(author, version, about = "ripplecount - pulse counting through a ripple counter")]
pub struct Cli {
    /// Optional subcommand (Run, Analyze, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: discover ripple.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format: csv, json, human
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// Number of trials
    #[arg(long, short = 'n')]
    pub trials: Option<usize>,

    /// Clock frequency in Hz
    #[arg(long)]
    pub frequency: Option<u32>,

    /// Clocking duration per trial (e.g., "23s")
    #[arg(long)]
    pub duration: Option<String>,

    /// Simulation jitter seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stream the trial log to this file while running
    #[arg(long)]
    pub log: Option<PathBuf>,

    /// Append to the trial log instead of truncating it
    #[arg(long)]
    pub append: bool,

    /// Leave trials flagged invalid out of the summary
    #[arg(long)]
    pub exclude_invalid: bool,

    /// Pace the simulated counter with the host clock
    #[arg(long)]
    pub realtime: bool,

    /// Pin the trial loop to this CPU
    #[arg(long)]
    pub cpu: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run trials (default)
    Run,
    /// Detrend a finished trial log
    Analyze {
        /// Trial log CSV (`iteration,n_ticks`)
        input: PathBuf,
        /// Moving average window
        #[arg(long)]
        window: Option<usize>,
        /// Quantization step of the sampled residue
        #[arg(long)]
        quantization_step: Option<u64>,
    },
    /// Print a default ripple.toml
    Init,
}

/// Run the ripplecount CLI with the process arguments.
///
/// # Returns
/// Returns `Ok(())` on success, or an error if something goes wrong.
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the ripplecount CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    // Initialize logging; stderr keeps stdout free for the trial log
    let filter = if cli.verbose {
        "ripplecount=debug"
    } else {
        "ripplecount=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Explicit --config must load; otherwise discover ripple.toml (CLI flags override)
    let config = match &cli.config {
        Some(path) => RippleConfig::load(path)
            .map_err(|e| anyhow::anyhow!("Failed to load {}: {}", path.display(), e))?,
        None => RippleConfig::discover().unwrap_or_default(),
    };

    let format: OutputFormat = cli
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    match &cli.command {
        Some(Commands::Init) => {
            let text = RippleConfig::default_toml();
            write_output(cli.output.as_deref(), &text)?;
        }
        Some(Commands::Analyze {
            input,
            window,
            quantization_step,
        }) => {
            let window = window.unwrap_or(config.analysis.window);
            let step = quantization_step.unwrap_or_else(|| config.quantization_step());
            let analysis = analyze_log(input, window, step)?;
            let text = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&analysis)?,
                OutputFormat::Csv | OutputFormat::Human => format_analysis(&analysis),
            };
            write_output(cli.output.as_deref(), &text)?;
        }
        Some(Commands::Run) | None => {
            run_trials(&cli, &config, format)?;
        }
    }

    Ok(())
}

/// Build an ExecutionConfig by layering: ripple.toml defaults → CLI overrides.
pub fn build_execution_config(cli: &Cli, config: &RippleConfig) -> anyhow::Result<ExecutionConfig> {
    let mut trial = config.trial_config()?;
    if let Some(trials) = cli.trials {
        trial.trials = trials;
    }
    if let Some(frequency) = cli.frequency {
        trial.clock.frequency_hz = frequency;
    }
    if let Some(duration) = &cli.duration {
        trial.clock.duration_ms = RippleConfig::parse_duration_ms(duration)?;
    }

    let mut simulation = config.simulation_config();
    if let Some(seed) = cli.seed {
        simulation.seed = seed;
    }

    Ok(ExecutionConfig {
        trial,
        simulation,
        realtime: cli.realtime,
        cpu: cli.cpu,
        exclude_invalid: cli.exclude_invalid || config.output.exclude_invalid,
        show_progress: true,
    })
}

/// Open a trial log, writing the header unless appending to a non-empty file
pub fn open_log(path: &Path, append: bool) -> anyhow::Result<TrialLogWriter<File>> {
    if append {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        if file.metadata()?.len() > 0 {
            return Ok(TrialLogWriter::resume(file));
        }
        Ok(TrialLogWriter::new(file)?)
    } else {
        Ok(TrialLogWriter::new(File::create(path)?)?)
    }
}

fn run_trials(cli: &Cli, config: &RippleConfig, format: OutputFormat) -> anyhow::Result<()> {
    let exec_config = build_execution_config(cli, config)?;
    let trial = &exec_config.trial;
    info!(
        trials = trial.trials,
        frequency_hz = trial.clock.frequency_hz,
        duration_ms = trial.clock.duration_ms,
        realtime = exec_config.realtime,
        "starting run"
    );

    let executor = Executor::new(exec_config);
    let append = cli.append || config.output.append;
    let log_path = cli
        .log
        .clone()
        .or_else(|| config.output.log_path.as_ref().map(PathBuf::from));

    // CSV streams the trial log itself to the output
    let report = if format == OutputFormat::Csv {
        match &cli.output {
            Some(path) => {
                let mut log = open_log(path, append)?;
                let report = executor.execute(Some(&mut log))?;
                eprintln!("Trial log written to: {}", path.display());
                report
            }
            None => {
                let mut log = TrialLogWriter::new(std::io::stdout().lock())?;
                executor.execute(Some(&mut log))?
            }
        }
    } else {
        let report = match &log_path {
            Some(path) => {
                let mut log = open_log(path, append)?;
                executor.execute(Some(&mut log))?
            }
            None => executor.execute::<File>(None)?,
        };

        let text = match format {
            OutputFormat::Json => generate_json_report(&report)?,
            _ => format_human_output(&report),
        };
        write_output(cli.output.as_deref(), &text)?;
        report
    };

    if report.summary.invalid_trials > 0 {
        eprintln!(
            "Warning: {} of {} trial(s) ran behind the clock schedule",
            report.summary.invalid_trials, report.summary.total_trials
        );
    }

    Ok(())
}

fn write_output(path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(text.as_bytes())?;
            eprintln!("Output written to: {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}
