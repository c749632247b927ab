//! Flow-telemetry CSV summarization.
//!
//! The flow-control add-on writes one CSV per print: flow rate, temperature
//! boost, heater duty, cooling-fan percentage, and a 0/1 dynamic-Z
//! activation flag per sample. This module reduces a file to a
//! [`TelemetrySummary`].
//!
//! Tolerance is per-column, not per-row: a blank or non-numeric cell
//! excludes that sample from that column's aggregates only. A column
//! missing from the header is a format incompatibility; a header with no
//! data rows is the distinct "logging never produced samples" case.

use std::io;
use std::path::Path;

use csv::StringRecord;
use serde::Serialize;

use crate::outcome::SourceOutcome;
use crate::severity::Severity;
use crate::thresholds::DiagnosticThresholds;

/// Column names every telemetry CSV must carry in its header.
pub const REQUIRED_COLUMNS: [&str; 5] = ["flow", "boost", "pwm", "fan_pct", "dynz_active"];

/// One parsed CSV row. Each field is `None` when its cell was blank or
/// unparseable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySample {
    /// Volumetric flow, mm³/s.
    pub flow: Option<f64>,
    /// Commanded temperature boost, °C.
    pub boost: Option<f64>,
    /// Heater duty fraction in [0, 1].
    pub duty: Option<f64>,
    /// Cooling-fan percentage in [0, 100].
    pub fan_pct: Option<f64>,
    /// Whether dynamic-Z was active at this sample.
    pub dynz_active: Option<bool>,
}

/// Aggregate statistics over one print's telemetry samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySummary {
    /// Number of data rows in the file.
    pub sample_count: usize,
    pub flow_mean: f64,
    pub flow_max: f64,
    pub boost_mean: f64,
    pub boost_max: f64,
    pub duty_mean: f64,
    pub duty_max: f64,
    pub fan_mean: f64,
    pub fan_min: f64,
    pub fan_max: f64,
    /// Mean absolute fan change between consecutive parsed samples, %/step.
    /// 0 with fewer than two fan values.
    pub fan_oscillation: f64,
    /// Percentage of samples with dynamic-Z active, in [0, 100].
    pub dynz_active_pct: f64,
}

impl TelemetrySummary {
    pub fn dynz_severity(&self, thresholds: &DiagnosticThresholds) -> Severity {
        thresholds.dynz_active_pct.classify(self.dynz_active_pct)
    }

    pub fn fan_oscillation_severity(&self, thresholds: &DiagnosticThresholds) -> Severity {
        thresholds.fan_oscillation.classify(self.fan_oscillation)
    }
}

/// Summarize telemetry CSV text from any reader.
pub fn summarize_csv_reader<R: io::Read>(input: R) -> SourceOutcome<TelemetrySummary> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(err) => return SourceOutcome::Incompatible(format!("unreadable CSV header: {err}")),
    };

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| column_index(&headers, name).is_none())
        .collect();
    if !missing.is_empty() {
        return SourceOutcome::Incompatible(format!(
            "missing expected column(s): {}",
            missing.join(", ")
        ));
    }

    // Presence checked just above.
    let flow_idx = column_index(&headers, "flow").unwrap_or_default();
    let boost_idx = column_index(&headers, "boost").unwrap_or_default();
    let duty_idx = column_index(&headers, "pwm").unwrap_or_default();
    let fan_idx = column_index(&headers, "fan_pct").unwrap_or_default();
    let dynz_idx = column_index(&headers, "dynz_active").unwrap_or_default();

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                log::debug!("skipping malformed telemetry row: {err}");
                continue;
            }
        };
        samples.push(TelemetrySample {
            flow: numeric_field(&record, flow_idx),
            boost: numeric_field(&record, boost_idx),
            duty: numeric_field(&record, duty_idx),
            fan_pct: numeric_field(&record, fan_idx),
            dynz_active: integer_field(&record, dynz_idx).map(|v| v != 0),
        });
    }

    if samples.is_empty() {
        return SourceOutcome::Empty;
    }

    SourceOutcome::Present(summarize_samples(&samples))
}

/// Summarize a telemetry CSV on disk. A file that cannot be opened is
/// [`SourceOutcome::Unavailable`].
pub fn summarize_csv_file(path: &Path) -> SourceOutcome<TelemetrySummary> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            log::warn!("telemetry CSV {} unreadable: {err}", path.display());
            return SourceOutcome::Unavailable(format!("cannot read {}: {err}", path.display()));
        }
    };
    summarize_csv_reader(io::BufReader::new(file))
}

/// Reduce parsed samples to aggregate statistics.
pub fn summarize_samples(samples: &[TelemetrySample]) -> TelemetrySummary {
    let flows: Vec<f64> = samples.iter().filter_map(|s| s.flow).collect();
    let boosts: Vec<f64> = samples.iter().filter_map(|s| s.boost).collect();
    let duties: Vec<f64> = samples.iter().filter_map(|s| s.duty).collect();
    let fans: Vec<f64> = samples.iter().filter_map(|s| s.fan_pct).collect();
    let dynz: Vec<bool> = samples.iter().filter_map(|s| s.dynz_active).collect();

    let fan_oscillation = if fans.len() > 1 {
        let total: f64 = fans.windows(2).map(|pair| (pair[1] - pair[0]).abs()).sum();
        total / (fans.len() - 1) as f64
    } else {
        0.0
    };

    let dynz_active_pct = if dynz.is_empty() {
        0.0
    } else {
        dynz.iter().filter(|&&active| active).count() as f64 / dynz.len() as f64 * 100.0
    };

    TelemetrySummary {
        sample_count: samples.len(),
        flow_mean: mean(&flows),
        flow_max: max(&flows),
        boost_mean: mean(&boosts),
        boost_max: max(&boosts),
        duty_mean: mean(&duties),
        duty_max: max(&duties),
        fan_mean: mean(&fans),
        fan_min: min(&fans),
        fan_max: max(&fans),
        fan_oscillation,
        dynz_active_pct,
    }
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header.trim() == name)
}

fn numeric_field(record: &StringRecord, index: usize) -> Option<f64> {
    let cell = record.get(index)?.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse().ok()
}

fn integer_field(record: &StringRecord, index: usize) -> Option<i64> {
    let cell = record.get(index)?.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse().ok()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn max(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

fn min(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "ts,flow,boost,pwm,fan_pct,dynz_active";

    fn summarize(text: &str) -> SourceOutcome<TelemetrySummary> {
        summarize_csv_reader(text.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Header validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_missing_column_is_incompatible() {
        let text = "ts,flow,boost,pwm,fan_pct\n1,2.0,0.0,0.5,100\n";
        match summarize(text) {
            SourceOutcome::Incompatible(detail) => assert!(detail.contains("dynz_active")),
            other => panic!("expected Incompatible, got {other:?}"),
        }
    }

    #[test]
    fn test_header_only_is_empty() {
        let outcome = summarize(&format!("{HEADER}\n"));
        assert_eq!(outcome, SourceOutcome::Empty);
    }

    #[test]
    fn test_empty_distinct_from_zero_row() {
        let header_only = summarize(&format!("{HEADER}\n"));
        let zero_row = summarize(&format!("{HEADER}\n0,0,0,0,0,0\n"));
        assert_eq!(header_only, SourceOutcome::Empty);
        let summary = zero_row.summary().expect("zero row is a real summary");
        assert_eq!(summary.sample_count, 1);
        assert_eq!(summary.flow_mean, 0.0);
    }

    // -----------------------------------------------------------------------
    // Aggregates
    // -----------------------------------------------------------------------

    #[test]
    fn test_basic_aggregates() {
        let text = format!(
            "{HEADER}\n\
             1,4.0,2.0,0.50,100,0\n\
             2,8.0,4.0,0.70,80,1\n\
             3,6.0,3.0,0.60,90,1\n"
        );
        let outcome = summarize(&text);
        let summary = outcome.summary().unwrap();

        assert_eq!(summary.sample_count, 3);
        assert!((summary.flow_mean - 6.0).abs() < 1e-9);
        assert_eq!(summary.flow_max, 8.0);
        assert!((summary.boost_mean - 3.0).abs() < 1e-9);
        assert_eq!(summary.boost_max, 4.0);
        assert!((summary.duty_mean - 0.6).abs() < 1e-9);
        assert_eq!(summary.duty_max, 0.7);
        assert_eq!(summary.fan_min, 80.0);
        assert_eq!(summary.fan_max, 100.0);
        assert!((summary.dynz_active_pct - 66.6666).abs() < 1e-3);
    }

    #[test]
    fn test_fan_oscillation_constant_sequence_is_zero() {
        let text = format!("{HEADER}\n1,1,0,0.1,50,0\n2,1,0,0.1,50,0\n3,1,0,0.1,50,0\n");
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.fan_oscillation, 0.0);
    }

    #[test]
    fn test_fan_oscillation_mean_absolute_change() {
        let text = format!("{HEADER}\n1,1,0,0.1,10,0\n2,1,0,0.1,40,0\n3,1,0,0.1,10,0\n");
        let summary = summarize(&text).summary().cloned().unwrap();
        // |40-10| and |10-40| over two steps.
        assert_eq!(summary.fan_oscillation, 30.0);
    }

    #[test]
    fn test_fan_oscillation_single_sample_is_zero() {
        let text = format!("{HEADER}\n1,1,0,0.1,70,0\n");
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.fan_oscillation, 0.0);
    }

    // -----------------------------------------------------------------------
    // Per-column tolerance
    // -----------------------------------------------------------------------

    #[test]
    fn test_blank_cell_excluded_from_its_column_only() {
        let text = format!(
            "{HEADER}\n\
             1,4.0,2.0,0.50,100,0\n\
             2,,4.0,0.70,80,1\n"
        );
        let summary = summarize(&text).summary().cloned().unwrap();
        // flow mean over the single parseable value.
        assert_eq!(summary.flow_mean, 4.0);
        // the row still contributes to every other column.
        assert!((summary.boost_mean - 3.0).abs() < 1e-9);
        assert_eq!(summary.sample_count, 2);
    }

    #[test]
    fn test_non_numeric_cell_excluded_from_its_column_only() {
        let text = format!(
            "{HEADER}\n\
             1,4.0,2.0,nan?,100,0\n\
             2,8.0,4.0,0.70,80,1\n"
        );
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.duty_mean, 0.70);
        assert!((summary.flow_mean - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_fan_cell_shrinks_oscillation_history() {
        // The oscillation metric runs over the parsed fan history; a gap
        // collapses to adjacency between its neighbors.
        let text = format!(
            "{HEADER}\n\
             1,1,0,0.1,10,0\n\
             2,1,0,0.1,,0\n\
             3,1,0,0.1,40,0\n"
        );
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.fan_oscillation, 30.0);
    }

    #[test]
    fn test_all_blank_column_yields_zero_aggregates() {
        let text = format!("{HEADER}\n1,,2.0,0.5,100,0\n2,,4.0,0.7,80,1\n");
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.flow_mean, 0.0);
        assert_eq!(summary.flow_max, 0.0);
        assert!((summary.boost_mean - 3.0).abs() < 1e-9);
    }

    // -----------------------------------------------------------------------
    // Dynamic-Z percentage
    // -----------------------------------------------------------------------

    #[test]
    fn test_dynz_percentage_counts_nonzero() {
        let text = format!(
            "{HEADER}\n1,1,0,0.1,50,0\n2,1,0,0.1,50,1\n3,1,0,0.1,50,1\n4,1,0,0.1,50,0\n"
        );
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.dynz_active_pct, 50.0);
    }

    #[test]
    fn test_dynz_blank_cells_excluded_from_percentage() {
        let text = format!("{HEADER}\n1,1,0,0.1,50,1\n2,1,0,0.1,50,\n");
        let summary = summarize(&text).summary().cloned().unwrap();
        assert_eq!(summary.dynz_active_pct, 100.0);
    }

    // -----------------------------------------------------------------------
    // File-level outcomes
    // -----------------------------------------------------------------------

    #[test]
    fn test_missing_file_is_unavailable() {
        let outcome = summarize_csv_file(Path::new("/nonexistent/print.csv"));
        assert!(matches!(outcome, SourceOutcome::Unavailable(_)));
    }

    #[test]
    fn test_file_roundtrip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("print.csv");
        std::fs::write(&path, format!("{HEADER}\n1,5.0,1.0,0.4,100,0\n")).unwrap();
        let outcome = summarize_csv_file(&path);
        let summary = outcome.summary().unwrap();
        assert_eq!(summary.sample_count, 1);
        assert_eq!(summary.flow_mean, 5.0);
    }

    // -----------------------------------------------------------------------
    // Severity accessors
    // -----------------------------------------------------------------------

    #[test]
    fn test_dynz_severity_strict_threshold() {
        let thresholds = DiagnosticThresholds::default();
        let mut summary = summarize(&format!("{HEADER}\n1,1,0,0.1,50,0\n"))
            .summary()
            .cloned()
            .unwrap();

        summary.dynz_active_pct = 20.0;
        assert_eq!(summary.dynz_severity(&thresholds), Severity::Ok);
        summary.dynz_active_pct = 20.01;
        assert_eq!(summary.dynz_severity(&thresholds), Severity::Critical);
    }

    #[test]
    fn test_fan_oscillation_severity() {
        let thresholds = DiagnosticThresholds::default();
        let mut summary = summarize(&format!("{HEADER}\n1,1,0,0.1,50,0\n"))
            .summary()
            .cloned()
            .unwrap();

        summary.fan_oscillation = 15.0;
        assert_eq!(summary.fan_oscillation_severity(&thresholds), Severity::Ok);
        summary.fan_oscillation = 16.0;
        assert_eq!(
            summary.fan_oscillation_severity(&thresholds),
            Severity::Warning
        );
    }
}
