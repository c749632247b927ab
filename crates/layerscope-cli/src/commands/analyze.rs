use std::path::PathBuf;

use layerscope_core::{DiagnosticThresholds, SourceOutcome, device_log, recommend, telemetry_csv};

use crate::discovery;
use crate::report::{AnalysisReport, CsvReport, render};

pub struct AnalyzeCommandConfig<'a> {
    pub klippy: Option<&'a str>,
    pub csv: Option<&'a str>,
    pub all: bool,
    pub samples: usize,
    pub output_path: Option<&'a str>,
}

pub fn run(cfg: AnalyzeCommandConfig<'_>) {
    let thresholds = DiagnosticThresholds::default();

    let klippy_path = cfg
        .klippy
        .map(PathBuf::from)
        .or_else(discovery::find_klippy_log);

    let csv_paths: Vec<PathBuf> = match cfg.csv {
        Some(path) => vec![PathBuf::from(path)],
        None => {
            let discovered = discovery::find_csv_logs(&discovery::default_csv_dir());
            if cfg.all {
                discovered
            } else {
                discovered.into_iter().take(1).collect()
            }
        }
    };

    // Partial data is a supported path; only a total absence of inputs is
    // an error exit.
    if klippy_path.is_none() && csv_paths.is_empty() {
        eprintln!("No device log or telemetry CSV available for analysis.");
        eprintln!("Provide --klippy or --csv, or run on the printer host.");
        std::process::exit(1);
    }

    let device_outcome = match &klippy_path {
        Some(path) => device_log::summarize_log_file(path, cfg.samples),
        None => SourceOutcome::Unavailable(
            "no device log found in conventional locations".to_string(),
        ),
    };

    let telemetry: Vec<CsvReport> = csv_paths
        .iter()
        .map(|path| CsvReport {
            path: path.display().to_string(),
            outcome: telemetry_csv::summarize_csv_file(path),
        })
        .collect();

    // The most recent CSV with a usable summary drives synthesis; any
    // older ones rendered under --all are informational.
    let telemetry_summary = telemetry.iter().find_map(|csv| csv.outcome.summary());
    let diagnosis =
        recommend::synthesize(device_outcome.summary(), telemetry_summary, &thresholds);

    let report = AnalysisReport {
        version: layerscope_core::VERSION.to_string(),
        thresholds,
        device_log_path: klippy_path.map(|path| path.display().to_string()),
        device_log: device_outcome,
        telemetry,
        diagnosis,
    };

    print!("{}", render(&report));

    if let Some(path) = cfg.output_path {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => println!("\nFull analysis written to {path}"),
                Err(err) => eprintln!("Failed to write {path}: {err}"),
            },
            Err(err) => eprintln!("Failed to serialize analysis: {err}"),
        }
    }
}
