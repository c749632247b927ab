//! # layerscope-core
//!
//! **Z-banding has causes; your printer already logged them.**
//!
//! `layerscope-core` is the analysis engine behind layerscope. It reads two
//! telemetry sources a Klipper printer produces during a print, the
//! firmware log (periodic heater status lines) and the flow-control
//! add-on's per-print CSV, reduces each to aggregate statistics, classifies
//! every metric against fixed warning/critical thresholds, and synthesizes
//! a prioritized list of probable root causes and corrective actions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use layerscope_core::{
//!     DiagnosticThresholds, device_log, recommend, telemetry_csv,
//! };
//!
//! let thresholds = DiagnosticThresholds::default();
//!
//! let log = device_log::summarize_log_file(Path::new("/tmp/klippy.log"), 1000);
//! let csv = telemetry_csv::summarize_csv_file(Path::new("print.csv"));
//!
//! let diagnosis = recommend::synthesize(log.summary(), csv.summary(), &thresholds);
//! if diagnosis.is_clear() {
//!     println!("no issues detected");
//! }
//! ```
//!
//! ## Architecture
//!
//! Log/CSV → Summarizer → Classifier (per metric) → Synthesizer
//!
//! Each analysis run reads a bounded amount of input (a tail-windowed log,
//! one CSV), computes its result synchronously, and shares no state with
//! other runs. Degraded inputs never crash the engine: missing files,
//! header-only CSVs, and malformed lines all surface as distinct
//! [`SourceOutcome`] variants so callers can explain exactly what happened.

pub mod device_log;
pub mod outcome;
pub mod recommend;
pub mod severity;
pub mod telemetry_csv;
pub mod thresholds;

pub use device_log::{DeviceLogSummary, HeaterReading, parse_stats_line};
pub use outcome::SourceOutcome;
pub use recommend::{Diagnosis, MechanicalCause, Priority, Recommendation, synthesize};
pub use severity::{Band, Severity};
pub use telemetry_csv::{TelemetrySample, TelemetrySummary};
pub use thresholds::DiagnosticThresholds;

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
