//! Trial Executor
//!
//! Runs trial sequences and turns their output into reports.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ExecutionConfig (ripple.toml + CLI overrides)
//!       │
//!       ▼
//! ┌─────────────┐
//! │  execution  │  Run trials, stream the trial log
//! └──────┬──────┘
//!        │
//!        ▼
//! ┌─────────────┐
//! │ formatting  │  Human-readable output
//! └─────────────┘
//!
//! trial log ──▶ analysis ──▶ formatting   (offline)
//! ```
//!
//! ## Modules
//!
//! - [`execution`] - Trial sequence on a simulated or host-paced rig
//! - [`analysis`] - Offline detrending of a finished trial log
//! - [`formatting`] - Human-readable output formatting

mod analysis;
mod execution;
mod formatting;

// Re-export public API
pub use analysis::{analyze_log, analyze_rows};
pub use execution::{ExecutionConfig, Executor};
pub use formatting::{format_analysis, format_human_output};
