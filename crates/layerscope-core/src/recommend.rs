//! Recommendation synthesis.
//!
//! Combines the device-log and telemetry summaries (either may be absent)
//! into a diagnosis. The rules form an explicit ordered list (device-log
//! rules before telemetry rules, insertion order is output order, nothing
//! is re-sorted or removed) so evaluation order stays auditable and each
//! rule is independently testable.
//!
//! When the flow-control add-on never appears in the device log, synthesis
//! short-circuits to a fixed mechanical-cause diagnosis: the add-on cannot
//! be implicated if it was never active, and telemetry is ignored on that
//! branch by design.

use serde::Serialize;

use crate::device_log::DeviceLogSummary;
use crate::severity::Severity;
use crate::telemetry_csv::TelemetrySummary;
use crate::thresholds::DiagnosticThresholds;

/// How urgently a recommendation should be acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// One corrective action with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub issue: String,
    pub action: String,
    pub reason: String,
}

/// One mechanical hypothesis with a fixed illustrative probability weight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MechanicalCause {
    /// Share of field cases attributed to this cause, percent.
    pub weight_pct: u8,
    pub cause: String,
    pub checks: Vec<String>,
}

/// Outcome of one synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Diagnosis {
    /// The add-on was not detected: layer artifacts have a mechanical
    /// explanation, ranked by fixed weights.
    MechanicalCauses(Vec<MechanicalCause>),
    /// Data-driven recommendations, in rule-evaluation order. Empty means
    /// no detected issues, a positive result rather than absent analysis.
    Recommendations(Vec<Recommendation>),
}

impl Diagnosis {
    /// True when analysis ran and found nothing to act on.
    pub fn is_clear(&self) -> bool {
        matches!(self, Diagnosis::Recommendations(recs) if recs.is_empty())
    }

    /// Number of data-driven issues (0 for the mechanical branch).
    pub fn issue_count(&self) -> usize {
        match self {
            Diagnosis::Recommendations(recs) => recs.len(),
            Diagnosis::MechanicalCauses(_) => 0,
        }
    }
}

type DeviceRule = fn(&DeviceLogSummary, &DiagnosticThresholds) -> Option<Recommendation>;
type TelemetryRule = fn(&TelemetrySummary, &DiagnosticThresholds) -> Option<Recommendation>;

/// Device-log rules in evaluation (and output) order.
const DEVICE_RULES: &[DeviceRule] = &[temp_range_rule, duty_saturation_rule, thermal_lag_rule];

/// Telemetry rules in evaluation (and output) order.
const TELEMETRY_RULES: &[TelemetryRule] = &[dynz_activation_rule];

/// Synthesize a diagnosis from whichever summaries are available.
pub fn synthesize(
    device: Option<&DeviceLogSummary>,
    telemetry: Option<&TelemetrySummary>,
    thresholds: &DiagnosticThresholds,
) -> Diagnosis {
    if let Some(summary) = device
        && !summary.add_on_detected
    {
        return Diagnosis::MechanicalCauses(mechanical_causes());
    }

    let mut recommendations = Vec::new();
    if let Some(summary) = device {
        for rule in DEVICE_RULES {
            if let Some(rec) = rule(summary, thresholds) {
                recommendations.push(rec);
            }
        }
    }
    if let Some(summary) = telemetry {
        for rule in TELEMETRY_RULES {
            if let Some(rec) = rule(summary, thresholds) {
                recommendations.push(rec);
            }
        }
    }

    Diagnosis::Recommendations(recommendations)
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

// Always HIGH when triggered, regardless of tier.
fn temp_range_rule(
    summary: &DeviceLogSummary,
    thresholds: &DiagnosticThresholds,
) -> Option<Recommendation> {
    if !summary.temp_range_severity(thresholds).is_breach() {
        return None;
    }
    Some(Recommendation {
        priority: Priority::High,
        issue: "Temperature Instability".to_string(),
        action: format!(
            "PID_CALIBRATE HEATER=extruder TARGET={}",
            summary.target_temp.trunc() as i64
        ),
        reason: format!(
            "Actual temperature varied over a {:.1}°C range during the print",
            summary.temp_range
        ),
    })
}

// The only rule that escalates with tier: MEDIUM at warning, HIGH at
// critical.
fn duty_saturation_rule(
    summary: &DeviceLogSummary,
    thresholds: &DiagnosticThresholds,
) -> Option<Recommendation> {
    let severity = summary.duty_severity(thresholds);
    if !severity.is_breach() {
        return None;
    }
    Some(Recommendation {
        priority: if severity == Severity::Critical {
            Priority::High
        } else {
            Priority::Medium
        },
        issue: "Heater Saturation".to_string(),
        action: "Reduce flow_k or print speed".to_string(),
        reason: format!(
            "Heater duty averaging {:.0}%, little headroom left",
            summary.duty_mean * 100.0
        ),
    })
}

// Always MEDIUM when triggered, regardless of tier.
fn thermal_lag_rule(
    summary: &DeviceLogSummary,
    thresholds: &DiagnosticThresholds,
) -> Option<Recommendation> {
    if !summary.lag_severity(thresholds).is_breach() {
        return None;
    }
    Some(Recommendation {
        priority: Priority::Medium,
        issue: "Thermal Lag".to_string(),
        action: "Increase ramp_rate_rise or reduce flow demands".to_string(),
        reason: format!(
            "Temperature lagging {:.1}°C behind target on average",
            summary.lag_mean
        ),
    })
}

fn dynz_activation_rule(
    summary: &TelemetrySummary,
    thresholds: &DiagnosticThresholds,
) -> Option<Recommendation> {
    if !summary.dynz_severity(thresholds).is_breach() {
        return None;
    }
    Some(Recommendation {
        priority: Priority::Medium,
        issue: "Excessive Dynamic-Z Activation".to_string(),
        action: "Raise dynz_activate_score or reduce print speeds".to_string(),
        reason: format!(
            "Dynamic-Z active for {:.1}% of the print, indicating sustained thermal stress",
            summary.dynz_active_pct
        ),
    })
}

/// The fixed mechanical-cause list returned when the add-on is absent.
pub fn mechanical_causes() -> Vec<MechanicalCause> {
    vec![
        MechanicalCause {
            weight_pct: 60,
            cause: "Z-axis mechanical issues".to_string(),
            checks: vec![
                "Move the Z axis by hand; travel should be smooth".to_string(),
                "Clean and lubricate the lead screw".to_string(),
                "Verify Z-axis alignment and couplings".to_string(),
            ],
        },
        MechanicalCause {
            weight_pct: 20,
            cause: "Pressure advance tuning".to_string(),
            checks: vec![
                "Run a pressure advance calibration test".to_string(),
                "Store the calibrated value for this filament".to_string(),
            ],
        },
        MechanicalCause {
            weight_pct: 10,
            cause: "Belt tension".to_string(),
            checks: vec![
                "Check belt tension; it should feel like a plucked guitar string".to_string(),
                "Use a belt tension meter if available".to_string(),
            ],
        },
        MechanicalCause {
            weight_pct: 10,
            cause: "Frame stability".to_string(),
            checks: vec![
                "Tighten all frame bolts".to_string(),
                "Check the frame for squareness".to_string(),
            ],
        },
    ]
}
