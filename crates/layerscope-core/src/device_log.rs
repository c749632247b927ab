//! Device-log summarization.
//!
//! Klipper's firmware log interleaves periodic `Stats ` lines (one heater
//! status reading per line) with unrelated output. This module extracts
//! those readings from the tail of the log, filters them down to the ones
//! that plausibly belong to the current print, and reduces them to a
//! [`DeviceLogSummary`] of aggregate temperature and heater statistics.
//!
//! The whole line sequence is additionally scanned for the flow-control
//! add-on's module names: if they never appear, layer artifacts cannot be
//! blamed on the add-on and downstream synthesis switches to a mechanical
//! diagnosis.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::outcome::SourceOutcome;
use crate::severity::Severity;
use crate::thresholds::DiagnosticThresholds;

/// Literal prefix of heater status lines in klippy.log.
const STATS_PREFIX: &str = "Stats ";

/// Readings at or below this target are idle/standby heater states or
/// non-extruder heaters. Filtering on it is a deliberate approximation:
/// it keeps printing-temperature extruder readings for common materials
/// but would also drop a genuinely low-temperature print.
pub const PRINT_TEMP_CUTOFF: f64 = 150.0;

/// Default tail window of status lines to analyze. Bounds memory and
/// compute on arbitrarily large logs; only the current print matters.
pub const DEFAULT_SAMPLE_LIMIT: usize = 1000;

/// Module names whose presence in the log identifies the flow-control
/// add-on.
const ADD_ON_TOKENS: [&str; 2] = ["extruder_monitor", "gcode_interceptor"];

/// One heater status reading. Consumed immediately into aggregate
/// statistics, never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaterReading {
    /// Commanded temperature, °C.
    pub target: f64,
    /// Measured temperature, °C.
    pub actual: f64,
    /// Heater duty fraction in [0, 1].
    pub duty: f64,
}

/// Aggregate heater statistics over the windowed, print-relevant readings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceLogSummary {
    /// Mean commanded temperature, °C.
    pub target_temp: f64,
    /// Mean measured temperature, °C.
    pub actual_mean: f64,
    /// Sample standard deviation of measured temperature, °C.
    pub actual_stdev: f64,
    /// Measured temperature spread (max − min), °C. Always ≥ 0.
    pub temp_range: f64,
    /// Mean heater duty fraction.
    pub duty_mean: f64,
    /// Peak heater duty fraction.
    pub duty_max: f64,
    /// Mean thermal lag (target − actual), °C. Negative on overshoot.
    pub lag_mean: f64,
    /// Worst thermal lag, °C. Negative on overshoot.
    pub lag_max: f64,
    /// Whether the flow-control add-on's modules appear anywhere in the log.
    pub add_on_detected: bool,
}

impl DeviceLogSummary {
    pub fn temp_range_severity(&self, thresholds: &DiagnosticThresholds) -> Severity {
        thresholds.temp_range.classify(self.temp_range)
    }

    pub fn duty_severity(&self, thresholds: &DiagnosticThresholds) -> Severity {
        thresholds.heater_duty.classify(self.duty_mean)
    }

    pub fn lag_severity(&self, thresholds: &DiagnosticThresholds) -> Severity {
        thresholds.thermal_lag.classify(self.lag_mean)
    }
}

fn stats_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"extruder: target=(\d+\.?\d*) temp=(\d+\.?\d*) pwm=(\d+\.?\d*)")
            .expect("status pattern compiles")
    })
}

/// Extract a heater reading from one log line.
///
/// Returns `None` both when the pattern is absent (the common case; most
/// log lines are not status lines) and when a structurally matching line
/// carries an unparseable number. Neither is an error.
pub fn parse_stats_line(line: &str) -> Option<HeaterReading> {
    let caps = stats_pattern().captures(line)?;
    let target = caps[1].parse().ok()?;
    let actual = caps[2].parse().ok()?;
    let duty = caps[3].parse().ok()?;
    Some(HeaterReading {
        target,
        actual,
        duty,
    })
}

/// Summarize an ordered sequence of log lines.
///
/// Status lines are filtered by prefix, tail-windowed to the most recent
/// `sample_limit`, extracted, and kept only while `target` exceeds
/// [`PRINT_TEMP_CUTOFF`]. Zero surviving readings is
/// [`SourceOutcome::Empty`]: insufficient data, not a measured all-good
/// result. The add-on scan runs over the full sequence, not the window.
pub fn summarize_log_lines<'a, I>(lines: I, sample_limit: usize) -> SourceOutcome<DeviceLogSummary>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats_lines: Vec<&str> = Vec::new();
    let mut add_on_detected = false;

    for line in lines {
        if line.starts_with(STATS_PREFIX) {
            stats_lines.push(line);
        }
        if !add_on_detected && ADD_ON_TOKENS.iter().any(|token| line.contains(token)) {
            add_on_detected = true;
        }
    }

    let window_start = stats_lines.len().saturating_sub(sample_limit);
    let readings: Vec<HeaterReading> = stats_lines[window_start..]
        .iter()
        .filter_map(|line| parse_stats_line(line))
        .filter(|reading| reading.target > PRINT_TEMP_CUTOFF)
        .collect();

    if readings.is_empty() {
        log::debug!(
            "no print-relevant readings in {} status line(s)",
            stats_lines.len()
        );
        return SourceOutcome::Empty;
    }

    SourceOutcome::Present(build_summary(&readings, add_on_detected))
}

/// Summarize a device log on disk.
///
/// Reads with lossy character decoding; malformed bytes never abort the
/// scan. An unreadable file is [`SourceOutcome::Unavailable`], not a crash.
pub fn summarize_log_file(
    path: &Path,
    sample_limit: usize,
) -> SourceOutcome<DeviceLogSummary> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("device log {} unreadable: {err}", path.display());
            return SourceOutcome::Unavailable(format!("cannot read {}: {err}", path.display()));
        }
    };
    let text = String::from_utf8_lossy(&bytes);
    summarize_log_lines(text.lines(), sample_limit)
}

fn build_summary(readings: &[HeaterReading], add_on_detected: bool) -> DeviceLogSummary {
    let n = readings.len() as f64;

    let target_temp = readings.iter().map(|r| r.target).sum::<f64>() / n;
    let actual_mean = readings.iter().map(|r| r.actual).sum::<f64>() / n;
    // Sample (n−1) standard deviation; a single reading has no spread.
    let actual_stdev = if readings.len() > 1 {
        let sum_sq: f64 = readings
            .iter()
            .map(|r| (r.actual - actual_mean).powi(2))
            .sum();
        (sum_sq / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    let actual_min = readings.iter().map(|r| r.actual).fold(f64::INFINITY, f64::min);
    let actual_max = readings
        .iter()
        .map(|r| r.actual)
        .fold(f64::NEG_INFINITY, f64::max);

    let duty_mean = readings.iter().map(|r| r.duty).sum::<f64>() / n;
    let duty_max = readings
        .iter()
        .map(|r| r.duty)
        .fold(f64::NEG_INFINITY, f64::max);

    // Lag stays signed: overshoot (actual above target) must survive as a
    // negative value.
    let lag_mean = readings.iter().map(|r| r.target - r.actual).sum::<f64>() / n;
    let lag_max = readings
        .iter()
        .map(|r| r.target - r.actual)
        .fold(f64::NEG_INFINITY, f64::max);

    DeviceLogSummary {
        target_temp,
        actual_mean,
        actual_stdev,
        temp_range: actual_max - actual_min,
        duty_mean,
        duty_max,
        lag_mean,
        lag_max,
        add_on_detected,
    }
}
