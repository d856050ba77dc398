//! Output Formatting
//!
//! Human-readable output for run reports and offline analyses.

use ripplecount_core::TrialStatus;
use ripplecount_report::RunReport;
use ripplecount_stats::{DetrendAnalysis, SeriesAnalysis};

fn section(output: &mut String, title: &str) {
    output.push_str(&format!("\n{}\n", title));
    output.push_str(&"-".repeat(60));
    output.push('\n');
}

/// Format a report for human-readable terminal display
pub fn format_human_output(report: &RunReport) -> String {
    let mut output = String::new();
    let config = &report.meta.config;

    output.push('\n');
    output.push_str("ripplecount Results\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  clock: {} Hz for {} ms  (half period {} us)\n",
        config.clock.frequency_hz,
        config.clock.duration_ms,
        config.clock.half_period_us()
    ));
    output.push_str(&format!(
        "  reset: {} ms  stabilize: {} ms  trials: {}\n",
        config.reset_ms, config.stabilize_ms, config.trials
    ));

    section(&mut output, "Trials");
    output.push_str(&format!(
        "  {:>6}  {:>10}  {:>9}  {:>10}  {:>8}\n",
        "trial", "n_ticks", "overflows", "pulses", "slack"
    ));
    for trial in &report.trials {
        let icon = match trial.status {
            TrialStatus::Valid => "✓",
            TrialStatus::Invalid { .. } => "✗",
        };
        output.push_str(&format!(
            "{} {:>6}  {:>10}  {:>9}  {:>10}  {:>5} us\n",
            icon,
            trial.index,
            trial.total_count,
            trial.overflow_count,
            trial.pulses,
            trial.max_slack_us
        ));
        if let TrialStatus::Invalid { reason } = &trial.status {
            output.push_str(&format!("      invalid: {}\n", reason));
        }
    }

    section(&mut output, "Summary");
    let summary = &report.summary;
    output.push_str(&format!(
        "  Trials: {}  Invalid: {}{}\n",
        summary.total_trials,
        summary.invalid_trials,
        if summary.excluded_invalid {
            " (excluded)"
        } else {
            ""
        }
    ));
    match (&summary.statistics, &summary.error) {
        (Some(stats), _) => {
            output.push_str(&format!(
                "  mean: {:.4}  variance: {:.4}  stddev: {:.4}\n",
                stats.mean, stats.variance, stats.std_dev
            ));
            let ratio = stats
                .mean_variance_ratio
                .map(|r| format!("{:.6}", r))
                .unwrap_or_else(|| "undefined".to_string());
            output.push_str(&format!(
                "  R approx (mean/variance): {}  cv: {:.4}%\n",
                ratio,
                stats.coefficient_of_variation()
            ));
        }
        (None, Some(error)) => output.push_str(&format!("  summary unavailable: {}\n", error)),
        (None, None) => output.push_str("  summary unavailable\n"),
    }

    output
}

fn series_lines(output: &mut String, label: &str, s: &SeriesAnalysis) {
    output.push_str(&format!("  {}\n", label));
    output.push_str(&format!(
        "    mean: {:.4}  measured variance: {:.4}\n",
        s.mean, s.measured_variance
    ));
    let ratio = s
        .r_ratio
        .map(|r| format!("{:.6}", r))
        .unwrap_or_else(|| "undefined".to_string());
    output.push_str(&format!(
        "    real variance: {:.4}  real std: {:.4}  R: {}\n",
        s.real_variance, s.real_std, ratio
    ));
}

/// Format a detrending analysis for terminal display
pub fn format_analysis(analysis: &DetrendAnalysis) -> String {
    let mut output = String::new();

    output.push('\n');
    output.push_str("ripplecount Analysis\n");
    output.push_str(&"=".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "  samples: {}  window: {}  quantization step: {} (variance {:.4})\n",
        analysis.detrended.len(),
        analysis.window,
        analysis.quantization_step,
        analysis.quantization_variance
    ));

    section(&mut output, "Variance");
    series_lines(&mut output, "original", &analysis.original);
    series_lines(&mut output, "temperature corrected", &analysis.corrected);

    output
}
