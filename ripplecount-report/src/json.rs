//! JSON Output

use crate::report::RunReport;

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ripplecount_core::{TrialConfig, TrialRecord, TrialStatus};

    #[test]
    fn test_json_shape() {
        let trials = (1..=2)
            .map(|index| TrialRecord {
                index,
                total_count: 32_868,
                overflow_count: 2,
                pulses: 32_868,
                max_slack_us: 3,
                status: TrialStatus::Valid,
            })
            .collect();
        let report = RunReport::new(TrialConfig::default(), None, trials, false);
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["trials"][1]["index"], 2);
        assert_eq!(value["trials"][0]["total_count"], 32_868);
        assert_eq!(value["trials"][0]["status"], "valid");
        assert_eq!(value["meta"]["config"]["clock"]["frequency_hz"], 8192);
        assert_eq!(value["summary"]["statistics"]["variance"], 0.0);
        assert!(value["summary"]["statistics"]["mean_variance_ratio"].is_null());
    }

    #[test]
    fn test_round_trip() {
        let report = RunReport::new(TrialConfig::default(), None, Vec::new(), false);
        let json = generate_json_report(&report).unwrap();
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.meta.config, report.meta.config);
        assert!(parsed.summary.statistics.is_none());
    }
}
