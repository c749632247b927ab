//! Report rendering.
//!
//! Turns the structured analysis into displayable text. Two lines carry
//! machine-scrapable markers for the hook service: `Assessment:` (always
//! present) and `Issues Found:` (data-driven diagnoses only). The same
//! [`AnalysisReport`] serializes to JSON for `--output`.

use std::fmt::Write as _;

use serde::Serialize;

use layerscope_core::{
    Diagnosis, DiagnosticThresholds, SourceOutcome, TelemetrySummary,
    device_log::DeviceLogSummary,
};

/// One analyzed telemetry CSV.
#[derive(Debug, Clone, Serialize)]
pub struct CsvReport {
    pub path: String,
    pub outcome: SourceOutcome<TelemetrySummary>,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub version: String,
    pub thresholds: DiagnosticThresholds,
    pub device_log_path: Option<String>,
    pub device_log: SourceOutcome<DeviceLogSummary>,
    pub telemetry: Vec<CsvReport>,
    pub diagnosis: Diagnosis,
}

impl AnalysisReport {
    /// Whether any source produced a usable summary.
    pub fn has_data(&self) -> bool {
        self.device_log.is_present() || self.telemetry.iter().any(|csv| csv.outcome.is_present())
    }
}

const BANNER: &str = "============================================================";

/// Render the full text report.
pub fn render(report: &AnalysisReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{BANNER}");
    let _ = writeln!(out, "LAYERSCOPE v{} - Z-BANDING DIAGNOSTIC", report.version);
    let _ = writeln!(out, "{BANNER}");

    render_device_section(&mut out, report);
    for csv in &report.telemetry {
        render_csv_section(&mut out, csv, &report.thresholds);
    }
    render_diagnosis(&mut out, report);

    out
}

fn render_device_section(out: &mut String, report: &AnalysisReport) {
    let label = report.device_log_path.as_deref().unwrap_or("not found");
    let _ = writeln!(out, "\nDEVICE LOG ANALYSIS: {label}");
    let _ = writeln!(out, "{BANNER}");

    match &report.device_log {
        SourceOutcome::Present(summary) => {
            render_device_summary(out, summary, &report.thresholds)
        }
        SourceOutcome::Empty => {
            let _ = writeln!(out, "No print-relevant heater readings found.");
            let _ = writeln!(out, "  - The log may predate the print");
            let _ = writeln!(out, "  - Or status lines are not being generated");
        }
        SourceOutcome::Incompatible(detail) => {
            let _ = writeln!(out, "Device log format not recognized: {detail}");
        }
        SourceOutcome::Unavailable(detail) => {
            let _ = writeln!(out, "Device log unavailable: {detail}");
        }
    }
}

fn render_device_summary(
    out: &mut String,
    summary: &DeviceLogSummary,
    thresholds: &DiagnosticThresholds,
) {
    let _ = writeln!(out, "Temperature");
    let _ = writeln!(out, "  Target: {:.1}°C", summary.target_temp);
    let _ = writeln!(
        out,
        "  Actual: {:.1}°C (stdev {:.2}°C)",
        summary.actual_mean, summary.actual_stdev
    );
    let _ = writeln!(
        out,
        "  Spread: {:.1}°C [{}]",
        summary.temp_range,
        summary.temp_range_severity(thresholds)
    );

    let _ = writeln!(out, "Heater");
    let _ = writeln!(
        out,
        "  Duty: avg {:.0}%, max {:.0}% [{}]",
        summary.duty_mean * 100.0,
        summary.duty_max * 100.0,
        summary.duty_severity(thresholds)
    );
    let _ = writeln!(
        out,
        "  Thermal lag: avg {:.1}°C, max {:.1}°C [{}]",
        summary.lag_mean,
        summary.lag_max,
        summary.lag_severity(thresholds)
    );

    let _ = writeln!(
        out,
        "Flow-control add-on: {}",
        if summary.add_on_detected {
            "detected"
        } else {
            "NOT detected"
        }
    );
}

fn render_csv_section(out: &mut String, csv: &CsvReport, thresholds: &DiagnosticThresholds) {
    let _ = writeln!(out, "\nTELEMETRY ANALYSIS: {}", csv.path);
    let _ = writeln!(out, "{BANNER}");

    match &csv.outcome {
        SourceOutcome::Present(summary) => render_csv_summary(out, summary, thresholds),
        SourceOutcome::Empty => {
            let _ = writeln!(out, "Telemetry log is empty (only a header present).");
            let _ = writeln!(out, "  - Logging may never have started this print");
            let _ = writeln!(out, "  - Or the monitor module was not loaded");
            let _ = writeln!(out, "  - Or the print ended before logging began");
        }
        SourceOutcome::Incompatible(detail) => {
            let _ = writeln!(out, "Telemetry CSV format incompatible: {detail}");
        }
        SourceOutcome::Unavailable(detail) => {
            let _ = writeln!(out, "Telemetry CSV unavailable: {detail}");
        }
    }
}

fn render_csv_summary(
    out: &mut String,
    summary: &TelemetrySummary,
    thresholds: &DiagnosticThresholds,
) {
    let _ = writeln!(out, "Samples: {}", summary.sample_count);
    let _ = writeln!(
        out,
        "Flow: avg {:.1} mm³/s, max {:.1}",
        summary.flow_mean, summary.flow_max
    );
    let _ = writeln!(
        out,
        "Boost: avg {:.1}°C, max {:.1}°C",
        summary.boost_mean, summary.boost_max
    );
    let _ = writeln!(
        out,
        "Duty: avg {:.0}%, max {:.0}%",
        summary.duty_mean * 100.0,
        summary.duty_max * 100.0
    );
    let _ = writeln!(
        out,
        "Fan: avg {:.0}% (range {:.0}-{:.0}%), oscillation {:.1}%/step [{}]",
        summary.fan_mean,
        summary.fan_min,
        summary.fan_max,
        summary.fan_oscillation,
        summary.fan_oscillation_severity(thresholds)
    );
    let _ = writeln!(
        out,
        "Dynamic-Z: active {:.1}% of print [{}]",
        summary.dynz_active_pct,
        summary.dynz_severity(thresholds)
    );
}

fn render_diagnosis(out: &mut String, report: &AnalysisReport) {
    let _ = writeln!(out, "\nRECOMMENDATIONS");
    let _ = writeln!(out, "{BANNER}");

    if !report.has_data() {
        let _ = writeln!(out, "No data available for analysis.");
        let _ = writeln!(out, "Provide --klippy or --csv, or run on the printer host.");
        let _ = writeln!(out, "\nAssessment: no data available for analysis");
        return;
    }

    match &report.diagnosis {
        Diagnosis::MechanicalCauses(causes) => {
            let _ = writeln!(
                out,
                "DIAGNOSIS: issue is not related to the flow-control add-on\n"
            );
            let _ = writeln!(out, "Most likely causes, by share of field cases:");
            for (i, cause) in causes.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{}. {} ({}% of cases)",
                    i + 1,
                    cause.cause,
                    cause.weight_pct
                );
                for check in &cause.checks {
                    let _ = writeln!(out, "   - {check}");
                }
            }
            let _ = writeln!(
                out,
                "\nAssessment: add-on not detected, check mechanical causes"
            );
        }
        Diagnosis::Recommendations(recs) if recs.is_empty() => {
            let _ = writeln!(out, "No issues detected in the flow-control system.\n");
            let _ = writeln!(out, "If layer inconsistencies persist, check:");
            let _ = writeln!(out, "  - Z-axis mechanical components (lead screw, linear rails)");
            let _ = writeln!(out, "  - Belt tension and condition");
            let _ = writeln!(out, "  - Frame rigidity and squareness");
            let _ = writeln!(out, "  - Pressure advance calibration for this filament");
            let _ = writeln!(out, "\nIssues Found: 0");
            let _ = writeln!(out, "Assessment: no issues detected");
        }
        Diagnosis::Recommendations(recs) => {
            for (i, rec) in recs.iter().enumerate() {
                let _ = writeln!(out, "{}. [{}] {}", i + 1, rec.priority, rec.issue);
                let _ = writeln!(out, "   Reason: {}", rec.reason);
                let _ = writeln!(out, "   Action: {}", rec.action);
            }
            let _ = writeln!(out, "\nIssues Found: {}", recs.len());
            let _ = writeln!(out, "Assessment: {} issue(s) detected", recs.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layerscope_core::{recommend, synthesize};

    fn device_summary(add_on: bool) -> DeviceLogSummary {
        DeviceLogSummary {
            target_temp: 210.0,
            actual_mean: 209.2,
            actual_stdev: 0.72,
            temp_range: 2.0,
            duty_mean: 0.6167,
            duty_max: 0.95,
            lag_mean: 0.83,
            lag_max: 2.0,
            add_on_detected: add_on,
        }
    }

    fn report_with(
        device: SourceOutcome<DeviceLogSummary>,
        telemetry: Vec<CsvReport>,
    ) -> AnalysisReport {
        let thresholds = DiagnosticThresholds::default();
        let telemetry_summary = telemetry.iter().find_map(|csv| csv.outcome.summary());
        let diagnosis = synthesize(device.summary(), telemetry_summary, &thresholds);
        AnalysisReport {
            version: layerscope_core::VERSION.to_string(),
            thresholds,
            device_log_path: Some("/tmp/klippy.log".to_string()),
            device_log: device,
            telemetry,
            diagnosis,
        }
    }

    #[test]
    fn test_issue_report_carries_markers() {
        let report = report_with(SourceOutcome::Present(device_summary(true)), Vec::new());
        let text = render(&report);
        assert!(text.contains("Issues Found: 1"));
        assert!(text.contains("Assessment: 1 issue(s) detected"));
        assert!(text.contains("[HIGH] Temperature Instability"));
    }

    #[test]
    fn test_clear_report_is_a_positive_result() {
        let mut summary = device_summary(true);
        summary.temp_range = 0.4;
        let report = report_with(SourceOutcome::Present(summary), Vec::new());
        let text = render(&report);
        assert!(text.contains("No issues detected"));
        assert!(text.contains("Issues Found: 0"));
        // Generic mechanical guidance still surfaces as advisory text.
        assert!(text.contains("Belt tension and condition"));
    }

    #[test]
    fn test_mechanical_diagnosis_lists_weights() {
        let report = report_with(SourceOutcome::Present(device_summary(false)), Vec::new());
        let text = render(&report);
        assert!(text.contains("not related to the flow-control add-on"));
        assert!(text.contains("(60% of cases)"));
        assert!(text.contains("Assessment: add-on not detected"));
        assert!(!text.contains("Issues Found:"));
    }

    #[test]
    fn test_no_data_assessment() {
        let report = report_with(
            SourceOutcome::Unavailable("cannot read /tmp/klippy.log".to_string()),
            vec![CsvReport {
                path: "print.csv".to_string(),
                outcome: SourceOutcome::Unavailable("no such file".to_string()),
            }],
        );
        let text = render(&report);
        assert!(text.contains("Assessment: no data available for analysis"));
        assert!(text.contains("Device log unavailable"));
        assert!(text.contains("Telemetry CSV unavailable"));
    }

    #[test]
    fn test_empty_sources_render_procedural_hints() {
        let report = report_with(
            SourceOutcome::Empty,
            vec![CsvReport {
                path: "print.csv".to_string(),
                outcome: SourceOutcome::Empty,
            }],
        );
        let text = render(&report);
        assert!(text.contains("No print-relevant heater readings found."));
        assert!(text.contains("only a header present"));
        assert!(text.contains("Logging may never have started"));
    }

    #[test]
    fn test_severity_words_in_summary_sections() {
        let report = report_with(SourceOutcome::Present(device_summary(true)), Vec::new());
        let text = render(&report);
        // 2.0°C spread sits above warning but exactly on the critical
        // threshold.
        assert!(text.contains("Spread: 2.0°C [warning]"));
        assert!(text.contains("[ok]"));
    }

    #[test]
    fn test_json_roundtrip_shape() {
        let report = report_with(SourceOutcome::Present(device_summary(true)), Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["device_log"]["status"], "present");
        assert_eq!(json["diagnosis"]["kind"], "recommendations");
        assert_eq!(
            json["diagnosis"]["items"][0]["issue"],
            "Temperature Instability"
        );
        assert_eq!(json["diagnosis"]["items"][0]["priority"], "HIGH");
    }

    #[test]
    fn test_mechanical_causes_serialize() {
        let causes = recommend::mechanical_causes();
        let json = serde_json::to_value(&causes).unwrap();
        assert_eq!(json[0]["weight_pct"], 60);
    }
}
