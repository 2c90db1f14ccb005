//! One telemetry snapshot per request.
//!
//! There is no sampling timer: every call reads the sensor, the battery
//! board and the host probes, stamps the result and, when a recording is
//! active, appends one CSV row before returning.

use crate::battery::{BatteryEstimator, BatteryReport};
use crate::environment::{EnvironmentEngine, EnvironmentReport};
use crate::error::StationError;
use crate::health::HealthTracker;
use crate::probe::{HostHealth, SystemHealthProbe};
use crate::recorder::FlightRecorder;
use crate::state::Shared;
use chrono::{DateTime, Local};
use groundstation_host::{RawEnvironment, SensorTransport};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

/// Immutable, timestamped bundle of raw and derived telemetry
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    #[serde(flatten)]
    pub environment: EnvironmentReport,
    #[serde(flatten)]
    pub battery: BatteryReport,
    /// Unix seconds
    pub timestamp: f64,
    #[serde(flatten)]
    pub host: HostHealth,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<String>,
    #[serde(skip)]
    pub captured_at: DateTime<Local>,
}

pub struct TelemetryAggregator {
    sensor: Arc<dyn SensorTransport>,
    environment: EnvironmentEngine,
    battery: BatteryEstimator,
    probe: SystemHealthProbe,
    recorder: Shared<FlightRecorder>,
    health: HealthTracker,
}

impl TelemetryAggregator {
    pub fn new(
        sensor: Arc<dyn SensorTransport>,
        environment: EnvironmentEngine,
        battery: BatteryEstimator,
        probe: SystemHealthProbe,
        recorder: Shared<FlightRecorder>,
        health: HealthTracker,
    ) -> Self {
        Self {
            sensor,
            environment,
            battery,
            probe,
            recorder,
            health,
        }
    }

    pub async fn snapshot(&self) -> TelemetrySnapshot {
        let mut faults = Vec::new();

        let raw = match self.sensor.read().await {
            Ok(raw) => raw,
            Err(e) => {
                faults.push(StationError::SensorUnavailable(format!("{e:#}")));
                RawEnvironment::default()
            }
        };
        let environment = self.environment.derive(&raw, &mut faults);
        let battery = self.battery.read(&mut faults).await;
        let host = self.probe.collect(&mut faults).await;

        for fault in &faults {
            debug!("snapshot fault: {}", fault);
        }

        let captured_at = Local::now();
        let snapshot = TelemetrySnapshot {
            environment,
            battery,
            timestamp: captured_at.timestamp_micros() as f64 / 1_000_000.0,
            host,
            faults: faults.iter().map(ToString::to_string).collect(),
            captured_at,
        };

        self.health.snapshot_served();
        self.record(&snapshot);
        snapshot
    }

    fn record(&self, snapshot: &TelemetrySnapshot) {
        let appended = self.recorder.lock().append(snapshot);
        match appended {
            Ok(true) => self.health.row_logged(),
            Ok(false) => {}
            Err(e) => {
                error!("failed to append telemetry row: {}", e);
                self.health.log_failed();
            }
        }
    }
}
