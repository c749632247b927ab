//! Conventional log and telemetry locations.
//!
//! The device log is searched in a small fixed ordered list of paths; the
//! add-on's telemetry CSVs live in one conventional directory and are
//! picked newest-first by modification time. Explicit `--klippy`/`--csv`
//! flags bypass discovery entirely.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Candidate klippy.log locations, in lookup order.
fn candidate_klippy_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/tmp/klippy.log")];
    if let Some(home) = home_dir() {
        paths.push(home.join("printer_data/logs/klippy.log"));
        paths.push(home.join("klipper_logs/klippy.log"));
    }
    paths
}

/// First existing device log among the conventional locations.
pub fn find_klippy_log() -> Option<PathBuf> {
    let found = candidate_klippy_paths().into_iter().find(|p| p.exists());
    match &found {
        Some(path) => log::debug!("device log found at {}", path.display()),
        None => log::debug!("no device log in conventional locations"),
    }
    found
}

/// Directory where the flow-control add-on writes per-print CSVs.
pub fn default_csv_dir() -> PathBuf {
    home_dir()
        .map(|home| home.join("printer_data/logs/adaptive_flow"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// All telemetry CSVs in `dir`, newest first by modification time.
/// A missing directory yields an empty list.
pub fn find_csv_logs(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<(PathBuf, SystemTime)> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .filter_map(|path| {
            let modified = fs::metadata(&path).and_then(|meta| meta.modified()).ok()?;
            Some((path, modified))
        })
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1));
    files.into_iter().map(|(path, _)| path).collect()
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
