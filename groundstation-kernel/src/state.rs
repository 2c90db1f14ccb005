use crate::battery::BatteryEstimator;
use crate::config::StationConfig;
use crate::environment::EnvironmentEngine;
use crate::health::HealthTracker;
use crate::probe::SystemHealthProbe;
use crate::recorder::FlightRecorder;
use crate::sandbox::{CommandRunner, CommandSandbox, ShellRunner};
use crate::telemetry::TelemetryAggregator;
use groundstation_host::{BatteryTool, HelperCommandSensor, Lifepo4weredCli, NoSensor, SensorTransport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Everything a request handler can reach; one per process.
#[derive(Clone)]
pub struct StationContext {
    pub telemetry: Arc<TelemetryAggregator>,
    pub recorder: Shared<FlightRecorder>,
    pub sandbox: Arc<CommandSandbox>,
    pub health: HealthTracker,
}

impl StationContext {
    /// Wire the real collaborators described by the config.
    pub fn from_config(cfg: &StationConfig) -> Self {
        let battery = Lifepo4weredCli::new(
            cfg.battery.cli.clone(),
            Duration::from_secs(cfg.battery.read_timeout_secs),
        );
        Self::assemble(sensor_from_config(cfg), Arc::new(battery), Arc::new(ShellRunner), cfg)
    }

    pub fn assemble(
        sensor: Arc<dyn SensorTransport>,
        battery_tool: Arc<dyn BatteryTool>,
        runner: Arc<dyn CommandRunner>,
        cfg: &StationConfig,
    ) -> Self {
        let health = HealthTracker::new();
        let recorder = new_state(FlightRecorder::new(cfg.logging.dir.clone()));

        let telemetry = TelemetryAggregator::new(
            sensor,
            EnvironmentEngine::new(),
            BatteryEstimator::new(battery_tool, cfg.battery.vbat_min_fallback_mv, cfg.battery.vbat_full_mv),
            SystemHealthProbe::new(cfg.probes.thermal_zone.clone(), cfg.logging.dir.clone()),
            recorder.clone(),
            health.clone(),
        );

        let sandbox = CommandSandbox::new(
            cfg.sandbox.home_dir(),
            runner,
            Duration::from_secs(cfg.sandbox.timeout_secs),
            cfg.sandbox.max_command_len,
            health.clone(),
        );

        Self {
            telemetry: Arc::new(telemetry),
            recorder,
            sandbox: Arc::new(sandbox),
            health,
        }
    }
}

fn sensor_from_config(cfg: &StationConfig) -> Arc<dyn SensorTransport> {
    let Some(command) = cfg.sensor.command.as_deref() else {
        warn!("no sensor helper configured, environmental fields will be absent");
        return Arc::new(NoSensor);
    };

    match shell_words::split(command) {
        Ok(mut words) if !words.is_empty() => {
            let program = words.remove(0);
            info!("sensor helper: {}", command);
            Arc::new(HelperCommandSensor::new(
                program,
                words,
                Duration::from_secs(cfg.sensor.read_timeout_secs),
            ))
        }
        Ok(_) => {
            warn!("sensor command is empty, environmental fields will be absent");
            Arc::new(NoSensor)
        }
        Err(e) => {
            warn!("cannot parse sensor command {:?}: {}", command, e);
            Arc::new(NoSensor)
        }
    }
}
