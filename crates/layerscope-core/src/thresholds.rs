//! Diagnostic threshold configuration.
//!
//! Thresholds are an explicit value threaded through classification and
//! synthesis rather than ambient constants. The defaults are the
//! compatibility table the whole tool is calibrated against; changing them
//! changes which telemetry patterns count as evidence.

use serde::{Deserialize, Serialize};

use crate::severity::Band;

/// Warning/critical bands for every classified metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticThresholds {
    /// Spread of actual temperature (max − min) over the print window, °C.
    pub temp_range: Band,
    /// Mean heater duty fraction. Sustained high duty means the heater has
    /// no headroom left.
    pub heater_duty: Band,
    /// Mean thermal lag (target − actual), °C.
    pub thermal_lag: Band,
    /// Percentage of print time the dynamic-Z feature was active.
    pub dynz_active_pct: Band,
    /// Mean absolute cooling-fan change between consecutive samples, %/step.
    pub fan_oscillation: Band,
}

impl Default for DiagnosticThresholds {
    fn default() -> Self {
        Self {
            temp_range: Band::new(Some(1.0), Some(2.0)),
            heater_duty: Band::new(Some(0.85), Some(0.95)),
            thermal_lag: Band::new(Some(3.0), Some(5.0)),
            dynz_active_pct: Band::new(None, Some(20.0)),
            fan_oscillation: Band::new(Some(15.0), None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;

    #[test]
    fn test_default_table() {
        let t = DiagnosticThresholds::default();
        assert_eq!(t.temp_range.warning, Some(1.0));
        assert_eq!(t.temp_range.critical, Some(2.0));
        assert_eq!(t.heater_duty.warning, Some(0.85));
        assert_eq!(t.heater_duty.critical, Some(0.95));
        assert_eq!(t.thermal_lag.warning, Some(3.0));
        assert_eq!(t.thermal_lag.critical, Some(5.0));
        assert_eq!(t.dynz_active_pct.warning, None);
        assert_eq!(t.dynz_active_pct.critical, Some(20.0));
        assert_eq!(t.fan_oscillation.warning, Some(15.0));
        assert_eq!(t.fan_oscillation.critical, None);
    }

    #[test]
    fn test_serialization_roundtrip() {
        let t = DiagnosticThresholds::default();
        let json = serde_json::to_string(&t).unwrap();
        let parsed: DiagnosticThresholds = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, t);
    }

    #[test]
    fn test_custom_thresholds_change_classification() {
        let mut t = DiagnosticThresholds::default();
        assert_eq!(t.thermal_lag.classify(4.0), Severity::Warning);
        t.thermal_lag = Band::new(Some(1.0), Some(2.0));
        assert_eq!(t.thermal_lag.classify(4.0), Severity::Critical);
    }
}
