//! Two-tier severity classification shared by every diagnostic metric.
//!
//! A [`Band`] holds the warning/critical thresholds for one higher-is-worse
//! metric; [`Band::classify`] maps a measured scalar to a [`Severity`]. No
//! hysteresis, no history: classification is purely a function of the
//! current value and the two constants, so tests can probe boundary values
//! without touching process-wide state.

use serde::{Deserialize, Serialize};

/// Result of classifying one scalar against its warning/critical band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below every configured threshold.
    Ok,
    /// Above the warning threshold, below the critical one.
    Warning,
    /// Above the critical threshold.
    Critical,
}

impl Severity {
    /// Whether this severity should trigger a recommendation rule.
    pub fn is_breach(self) -> bool {
        self != Severity::Ok
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Warning/critical thresholds for one metric. Either tier may be absent
/// for single-threshold metrics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub warning: Option<f64>,
    pub critical: Option<f64>,
}

impl Band {
    pub const fn new(warning: Option<f64>, critical: Option<f64>) -> Self {
        Self { warning, critical }
    }

    /// Classify a measured value against this band.
    ///
    /// Comparison is strict `>` at both tiers: a value sitting exactly on a
    /// threshold does not breach it.
    pub fn classify(&self, value: f64) -> Severity {
        if let Some(critical) = self.critical
            && value > critical
        {
            return Severity::Critical;
        }
        if let Some(warning) = self.warning
            && value > warning
        {
            return Severity::Warning;
        }
        Severity::Ok
    }
}
