//! Print-complete trigger service.
//!
//! Moonraker knows when a print finishes; this service turns that event
//! into an analysis run. Two trigger modes:
//!
//! - **webhook**: an HTTP listener Moonraker's notifier posts
//!   `{filename, status}` events to,
//! - **poll**: a loop that queries Moonraker's `print_stats` object and
//!   reacts to the `printing → complete` transition (no Moonraker config
//!   needed).
//!
//! Either way the analysis itself runs as a subprocess (the `layerscope
//! analyze` binary) under a hard timeout: a run either produces a complete
//! report or fails explicitly, never partial output. The service extracts
//! the report's `Assessment:` / `Issues Found:` marker lines for its own
//! log and does not talk back to the printer.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Poll-mode query interval.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Report lines the service extracts from analyzer output.
pub const REPORT_MARKERS: [&str; 2] = ["Assessment:", "Issues Found:"];

/// Trigger service configuration.
#[derive(Debug, Clone)]
pub struct HookConfig {
    /// Port the webhook listener binds to.
    pub listen_port: u16,
    /// Moonraker base URL for poll mode.
    pub moonraker_url: String,
    /// Delay between the completion event and the analysis run, so the
    /// producing log writers can flush.
    pub settle: Duration,
    /// Hard ceiling on one analysis subprocess.
    pub analyze_timeout: Duration,
    /// Status-line sample count passed through to the analyzer.
    pub samples: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            listen_port: 7126,
            moonraker_url: "http://localhost:7125".to_string(),
            settle: Duration::from_secs(2),
            analyze_timeout: Duration::from_secs(120),
            samples: 1000,
        }
    }
}

/// A print lifecycle event as posted by Moonraker's notifier.
#[derive(Debug, Clone, Deserialize)]
pub struct PrintEvent {
    pub filename: Option<String>,
    pub status: Option<String>,
}

/// Whether an event status means a normally completed print.
pub fn is_complete_status(status: &str) -> bool {
    matches!(status, "complete" | "completed")
}

/// Extract the marker-tagged report lines from analyzer output.
pub fn extract_markers(report: &str) -> Vec<String> {
    report
        .lines()
        .filter(|line| REPORT_MARKERS.iter().any(|marker| line.contains(marker)))
        .map(|line| line.trim().to_string())
        .collect()
}

/// Outcome of one subprocess analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub success: bool,
    /// Marker lines extracted from the report.
    pub markers: Vec<String>,
}

impl AnalysisRun {
    fn failed() -> Self {
        Self {
            success: false,
            markers: Vec::new(),
        }
    }
}

/// Run one analysis as a subprocess of the current binary.
///
/// A run that exceeds `analyze_timeout` is killed and reported as failed;
/// it is not retried and no partial output is surfaced.
pub async fn run_analysis(config: &HookConfig) -> AnalysisRun {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(err) => {
            log::error!("cannot locate analyzer binary: {err}");
            return AnalysisRun::failed();
        }
    };

    let mut command = tokio::process::Command::new(exe);
    command
        .arg("analyze")
        .arg("--samples")
        .arg(config.samples.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(config.analyze_timeout, command.output()).await {
        Err(_) => {
            log::error!(
                "analysis timed out after {}s",
                config.analyze_timeout.as_secs()
            );
            return AnalysisRun::failed();
        }
        Ok(Err(err)) => {
            log::error!("failed to launch analyzer: {err}");
            return AnalysisRun::failed();
        }
        Ok(Ok(output)) => output,
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    let markers = extract_markers(&stdout);
    for marker in &markers {
        log::info!("{marker}");
    }
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::warn!(
            "analyzer exited with {}: {}",
            output.status,
            stderr.trim()
        );
    }

    AnalysisRun {
        success: output.status.success(),
        markers,
    }
}

// ---------------------------------------------------------------------------
// Webhook mode
// ---------------------------------------------------------------------------

struct AppState {
    config: HookConfig,
    /// Serializes analysis runs: concurrent triggers queue instead of
    /// racing over the same log files.
    run_lock: Mutex<()>,
}

async fn settle_and_analyze(state: &AppState) -> AnalysisRun {
    let _guard = state.run_lock.lock().await;
    tokio::time::sleep(state.config.settle).await;
    run_analysis(&state.config).await
}

async fn handle_print_event(
    State(state): State<Arc<AppState>>,
    body: String,
) -> (StatusCode, Json<Value>) {
    // Moonraker notifier templates occasionally produce malformed bodies;
    // tolerate them instead of rejecting the webhook.
    let event: PrintEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(err) => {
            log::warn!("invalid webhook body ({err}): {body}");
            return (StatusCode::OK, Json(json!({ "status": "ignored" })));
        }
    };

    let filename = event.filename.as_deref().unwrap_or("unknown");
    let status = event.status.as_deref().unwrap_or("unknown");
    log::info!("print event: {filename} ({status})");

    if !is_complete_status(status) {
        return (StatusCode::OK, Json(json!({ "status": "ignored" })));
    }

    let run = settle_and_analyze(&state).await;
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "analysis_success": run.success })),
    )
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn handle_manual_trigger(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    log::info!("manual analysis triggered");
    let run = settle_and_analyze(&state).await;
    let status = if run.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (
        status,
        Json(json!({ "success": run.success, "markers": run.markers })),
    )
}

async fn handle_index() -> Json<Value> {
    Json(json!({
        "name": "layerscope hook",
        "version": layerscope_core::VERSION,
        "endpoints": {
            "/": "This API index",
            "/adaptive_flow_analyze": {
                "method": "POST",
                "description": "Print event sink for Moonraker's notifier",
                "body": { "filename": "string", "status": "complete|cancelled|error" },
            },
            "/analyze": "Trigger an analysis run manually",
            "/health": "Service health check",
        },
    }))
}

/// Build the webhook router.
fn build_router(config: HookConfig) -> Router {
    let state = Arc::new(AppState {
        config,
        run_lock: Mutex::new(()),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/adaptive_flow_analyze", post(handle_print_event))
        .route("/analyze", get(handle_manual_trigger))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Run the webhook listener until the process exits.
pub async fn run_webhook(config: HookConfig) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{}", config.listen_port);
    let app = build_router(config);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("webhook listener on {addr}");
    axum::serve(listener, app).await
}

// ---------------------------------------------------------------------------
// Poll mode
// ---------------------------------------------------------------------------

/// Poll Moonraker for print state changes until `running` clears.
///
/// A `printing → complete` transition triggers one analysis run. Transient
/// query failures are logged and skipped; the loop keeps going.
pub async fn run_poll(config: HookConfig, running: Arc<AtomicBool>) {
    let client = reqwest::Client::new();
    let url = format!(
        "{}/printer/objects/query?print_stats",
        config.moonraker_url.trim_end_matches('/')
    );
    let mut last_state = String::new();

    log::info!("polling {} for print state changes", config.moonraker_url);

    while running.load(Ordering::SeqCst) {
        match query_print_state(&client, &url).await {
            Ok(state) => {
                if last_state == "printing" && is_complete_status(&state) {
                    log::info!(
                        "print completed, analyzing after {}s settle",
                        config.settle.as_secs()
                    );
                    tokio::time::sleep(config.settle).await;
                    let run = run_analysis(&config).await;
                    if !run.success {
                        log::warn!("post-print analysis failed");
                    }
                }
                last_state = state;
            }
            Err(err) => log::debug!("poll error: {err}"),
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    log::info!("poll loop stopped");
}

async fn query_print_state(client: &reqwest::Client, url: &str) -> Result<String, reqwest::Error> {
    let body: Value = client
        .get(url)
        .timeout(Duration::from_secs(5))
        .send()
        .await?
        .json()
        .await?;
    Ok(body
        .pointer("/result/status/print_stats/state")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}
