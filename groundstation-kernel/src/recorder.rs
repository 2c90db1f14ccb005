//! Flight recorder: one CSV file per logging session.
//!
//! Idle ──start──▶ Recording ──stop──▶ Idle
//!
//! Starting while already recording closes the current file first, so at
//! most one handle is ever open. Every row is flushed as soon as it is
//! written.

use crate::error::StationError;
use crate::telemetry::TelemetrySnapshot;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Display;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bumped whenever the column set changes.
pub const CSV_SCHEMA_VERSION: u32 = 1;

pub const CSV_HEADER: [&str; 17] = [
    "timestamp_iso",
    "timestamp_unix",
    "temperature_c",
    "humidity",
    "pressure_hpa",
    "gas_ohms",
    "battery_percent",
    "battery_mv",
    "dew_point_c",
    "altitude_m",
    "input_voltage_mv",
    "output_voltage_mv",
    "load_current_ma",
    "fire_risk_index",
    "fire_risk_level",
    "air_quality_index",
    "air_quality_level",
];

pub const DEFAULT_LOG_NAME: &str = "fire_mission";

const MAX_NAME_LEN: usize = 64;
const MAX_NAME_COLLISIONS: u32 = 1000;

/// An open recording
pub struct LogSession {
    path: PathBuf,
    note: Option<String>,
    writer: csv::Writer<File>,
    schema_version: u32,
    rows: u64,
    started_at: DateTime<Local>,
}

/// What the operator panel shows about the recorder
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecorderStatus {
    pub recording: bool,
    pub logfile: Option<String>,
    pub note: Option<String>,
    pub rows: u64,
    pub started_at: Option<String>,
    pub schema_version: u32,
}

pub struct FlightRecorder {
    log_dir: PathBuf,
    active: Option<LogSession>,
}

impl FlightRecorder {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            active: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    pub fn status(&self) -> RecorderStatus {
        match &self.active {
            Some(session) => RecorderStatus {
                recording: true,
                logfile: Some(session.path.display().to_string()),
                note: session.note.clone(),
                rows: session.rows,
                started_at: Some(session.started_at.to_rfc3339()),
                schema_version: session.schema_version,
            },
            None => RecorderStatus {
                recording: false,
                logfile: None,
                note: None,
                rows: 0,
                started_at: None,
                schema_version: CSV_SCHEMA_VERSION,
            },
        }
    }

    /// Open a new log file, closing any session still running.
    pub fn start(&mut self, name_hint: Option<&str>, note: Option<&str>) -> Result<PathBuf, StationError> {
        if self.active.is_some() {
            info!("new session requested while recording, closing the current one");
            if let Err(e) = self.stop() {
                warn!("previous session did not close cleanly: {}", e);
            }
        }

        fs::create_dir_all(&self.log_dir)?;

        let started_at = Local::now();
        let stem = format!("{}_{}", sanitize_name(name_hint), started_at.format("%Y%m%d_%H%M%S"));
        let (path, mut file) = create_unique(&self.log_dir, &stem)?;

        let note = note.map(flatten_note).filter(|n| !n.is_empty());
        if let Some(text) = &note {
            writeln!(file, "# note: {}", text)?;
        }

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(CSV_HEADER)?;
        writer.flush()?;

        info!("Logging → {}", path.display());
        self.active = Some(LogSession {
            path: path.clone(),
            note,
            writer,
            schema_version: CSV_SCHEMA_VERSION,
            rows: 0,
            started_at,
        });
        Ok(path)
    }

    /// Write one row; `Ok(false)` when idle.
    pub fn append(&mut self, snapshot: &TelemetrySnapshot) -> Result<bool, StationError> {
        let Some(session) = self.active.as_mut() else {
            return Ok(false);
        };
        session.writer.write_record(csv_row(snapshot))?;
        session.writer.flush()?;
        session.rows += 1;
        Ok(true)
    }

    /// Close the active session; stopping while idle succeeds with `None`.
    pub fn stop(&mut self) -> Result<Option<PathBuf>, StationError> {
        let Some(session) = self.active.take() else {
            return Ok(None);
        };
        let LogSession { path, mut writer, rows, .. } = session;

        writer.flush()?;
        let file = writer
            .into_inner()
            .map_err(|e| StationError::LogIo(std::io::Error::other(e.to_string())))?;
        file.sync_all()?;

        info!("Log saved → {} ({} rows)", path.display(), rows);
        Ok(Some(path))
    }

    /// Point the active session at another file handle.
    #[cfg(test)]
    pub(crate) fn redirect_active(&mut self, file: File) {
        if let Some(session) = self.active.as_mut() {
            session.writer = csv::Writer::from_writer(file);
        }
    }
}

/// One CSV row at the documented precision; absent values stay empty.
pub fn csv_row(s: &TelemetrySnapshot) -> Vec<String> {
    let env = &s.environment;
    let bat = &s.battery;
    vec![
        s.captured_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        format!("{:.3}", s.timestamp),
        float(env.temperature_c, 2),
        float(env.humidity, 1),
        float(env.pressure_hpa, 2),
        float(env.gas_ohms, 0),
        display(bat.battery_percent),
        display(bat.battery_mv),
        float(env.dew_point_c, 2),
        float(env.altitude_m, 2),
        display(bat.vin_mv),
        display(bat.vout_mv),
        display(bat.load_current_ma),
        float(env.fire_risk_index, 1),
        display(env.fire_risk_level),
        display(env.air_quality_index),
        display(env.air_quality_level),
    ]
}

fn float(v: Option<f64>, precision: usize) -> String {
    v.map(|x| format!("{:.*}", precision, x)).unwrap_or_default()
}

fn display<T: Display>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

fn sanitize_name(hint: Option<&str>) -> String {
    let cleaned: String = hint
        .unwrap_or_default()
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(MAX_NAME_LEN)
        .collect();

    if cleaned.trim_matches('_').is_empty() {
        DEFAULT_LOG_NAME.to_string()
    } else {
        cleaned
    }
}

fn flatten_note(note: &str) -> String {
    note.replace(['\r', '\n'], " ").trim().to_string()
}

/// Create `<stem>.csv`, or `<stem>_N.csv` if that name is taken; never truncates.
fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, File), StationError> {
    for attempt in 0..MAX_NAME_COLLISIONS {
        let name = if attempt == 0 {
            format!("{stem}.csv")
        } else {
            format!("{stem}_{attempt}.csv")
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(StationError::LogIo(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free log file name for {stem}"),
    )))
}
