//! HTTP surface of the ground station.
//!
//! Thin dispatch only: every handler forwards to the aggregator, the flight
//! recorder or the command sandbox and shapes the JSON the operator panel
//! expects. There is no authentication; the service is meant for a closed
//! field network.

use crate::health::ServiceHealth;
use crate::recorder::DEFAULT_LOG_NAME;
use crate::sandbox::CommandResult;
use crate::state::StationContext;
use crate::telemetry::TelemetrySnapshot;
use axum::body::Bytes;
use axum::http::StatusCode;
use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
struct StartLogRequest {
    filename: Option<String>,
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RunCommandRequest {
    #[serde(default)]
    cmd: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LogStatusView {
    recording: bool,
    logfile: Option<String>,
    note: Option<String>,
    schema_version: u32,
}

pub fn build_router(ctx: StationContext) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/telemetry", get(get_telemetry))
        .route("/api/start_log", post(start_log))
        .route("/api/stop_log", post(stop_log))
        .route("/api/log_status", get(log_status))
        .route("/api/run_command", post(run_command))
        .with_state(ctx)
}

// GET /system/health
async fn get_system_health(State(ctx): State<StationContext>) -> Json<ServiceHealth> {
    let recording = ctx.recorder.lock().is_recording();
    Json(ctx.health.get_health(recording))
}

// GET /api/telemetry
async fn get_telemetry(State(ctx): State<StationContext>) -> Json<TelemetrySnapshot> {
    Json(ctx.telemetry.snapshot().await)
}

// POST /api/start_log {filename?, note?}; a missing or malformed body counts as empty
async fn start_log(State(ctx): State<StationContext>, body: Bytes) -> (StatusCode, Json<Value>) {
    let req: StartLogRequest = serde_json::from_slice(&body).unwrap_or_default();
    let name = req
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_LOG_NAME);

    let started = ctx.recorder.lock().start(Some(name), req.note.as_deref());
    match started {
        Ok(path) => (
            StatusCode::OK,
            Json(json!({ "success": true, "logfile": path.display().to_string() })),
        ),
        Err(e) => {
            error!("cannot start flight log: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

// POST /api/stop_log
async fn stop_log(State(ctx): State<StationContext>) -> (StatusCode, Json<Value>) {
    let stopped = ctx.recorder.lock().stop();
    match stopped {
        Ok(Some(path)) => (
            StatusCode::OK,
            Json(json!({ "success": true, "logfile": path.display().to_string() })),
        ),
        Ok(None) => {
            info!("stop requested while idle");
            (StatusCode::OK, Json(json!({ "success": true })))
        }
        Err(e) => {
            error!("flight log did not close cleanly: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
        }
    }
}

// GET /api/log_status
async fn log_status(State(ctx): State<StationContext>) -> Json<LogStatusView> {
    let status = ctx.recorder.lock().status();
    Json(LogStatusView {
        recording: status.recording,
        logfile: status.logfile,
        note: status.note,
        schema_version: status.schema_version,
    })
}

// POST /api/run_command {cmd}
async fn run_command(
    State(ctx): State<StationContext>,
    Json(req): Json<RunCommandRequest>,
) -> Json<CommandResult> {
    let cmd = req.cmd.unwrap_or_default();
    Json(ctx.sandbox.run(&cmd).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StationConfig;
    use crate::testing::{FakeBatteryTool, RecordingRunner, ScriptedSensor};
    use groundstation_host::{BatteryParam, RawEnvironment};
    use std::path::Path;

    fn context(dir: &Path) -> StationContext {
        let mut cfg = StationConfig::default();
        cfg.logging.dir = dir.join("flight_logs");
        cfg.sandbox.home = Some(dir.to_path_buf());
        cfg.probes.thermal_zone = dir.join("thermal");

        let sensor = ScriptedSensor::reading(RawEnvironment {
            temperature_c: Some(24.0),
            humidity: Some(40.0),
            pressure_hpa: Some(1011.0),
            gas_ohms: Some(120_000.0),
            altitude_m: Some(35.0),
        });
        let battery = FakeBatteryTool::with(&[(BatteryParam::Vbat, 3400), (BatteryParam::VbatMin, 2950)]);
        StationContext::assemble(sensor, battery, RecordingRunner::succeeding("ok\n"), &cfg)
    }

    #[tokio::test]
    async fn test_log_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let body = Bytes::from_static(br#"{"filename": "ridge survey", "note": "north\nsector"}"#);
        let (code, Json(started)) = start_log(State(ctx.clone()), body).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(started["success"], true);
        let logfile = started["logfile"].as_str().unwrap().to_string();
        assert!(logfile.contains("ridge_survey_"));

        let Json(status) = log_status(State(ctx.clone())).await;
        assert!(status.recording);
        assert_eq!(status.logfile.as_deref(), Some(logfile.as_str()));
        assert_eq!(status.note.as_deref(), Some("north sector"));
        assert_eq!(status.schema_version, 1);

        let Json(_snapshot) = get_telemetry(State(ctx.clone())).await;
        assert_eq!(ctx.recorder.lock().status().rows, 1);

        let (code, Json(stopped)) = stop_log(State(ctx.clone())).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(stopped["logfile"], logfile.as_str());

        let text = std::fs::read_to_string(&logfile).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# note: north sector");
        assert!(lines[1].starts_with("timestamp_iso,timestamp_unix"));
        assert_eq!(lines.len(), 3);
    }

    #[tokio::test]
    async fn test_start_log_without_body_uses_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let (code, Json(started)) = start_log(State(ctx.clone()), Bytes::new()).await;
        assert_eq!(code, StatusCode::OK);
        assert!(started["logfile"].as_str().unwrap().contains("fire_mission_"));
    }

    #[tokio::test]
    async fn test_stop_while_idle_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let (code, Json(stopped)) = stop_log(State(ctx)).await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(stopped, json!({ "success": true }));
    }

    #[tokio::test]
    async fn test_telemetry_json_fields() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let Json(snapshot) = get_telemetry(State(ctx.clone())).await;
        let json = serde_json::to_value(&snapshot).unwrap();
        for field in [
            "temperature_c", "humidity", "pressure_hpa", "gas_ohms", "dew_point_c", "altitude_m",
            "fire_risk_index", "fire_risk_level", "air_quality_index", "air_quality_level",
            "battery_percent", "battery_mv", "vin_mv", "vout_mv", "load_current_ma", "timestamp",
            "cpu_temp_c", "load_1m", "mem_total_mb", "mem_used_mb", "disk_free_gb",
            "disk_used_pct", "ip_address",
        ] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(json["air_quality_level"], "Good");

        let Json(health) = get_system_health(State(ctx)).await;
        assert_eq!(health.snapshots_served, 1);
        assert!(!health.recording);
    }

    #[tokio::test]
    async fn test_run_command_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let req = RunCommandRequest { cmd: Some("shutdown now".into()) };
        let Json(result) = run_command(State(ctx.clone()), Json(req)).await;
        assert!(result.error);
        assert_eq!(result.output, "Blocked: dangerous command");
        assert_eq!(result.cwd, dir.path().display().to_string());

        let Json(result) = run_command(State(ctx.clone()), Json(RunCommandRequest { cmd: None })).await;
        assert!(!result.error);
        assert_eq!(result.output, "");

        let Json(result) = run_command(State(ctx), Json(RunCommandRequest { cmd: Some("uptime".into()) })).await;
        assert_eq!(result.output, "ok\n");
    }

    #[tokio::test]
    async fn test_start_log_io_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "").unwrap();

        let mut cfg = StationConfig::default();
        cfg.logging.dir = blocker.join("flight_logs");
        cfg.sandbox.home = Some(dir.path().to_path_buf());
        cfg.probes.thermal_zone = dir.path().join("thermal");
        let ctx = StationContext::assemble(
            ScriptedSensor::offline(),
            FakeBatteryTool::with(&[]),
            RecordingRunner::succeeding(""),
            &cfg,
        );

        let (code, Json(reply)) = start_log(State(ctx.clone()), Bytes::new()).await;
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(reply["success"], false);
        assert!(reply["error"].as_str().unwrap().starts_with("log I/O failure"));

        let Json(status) = log_status(State(ctx)).await;
        assert!(!status.recording);
    }
}
