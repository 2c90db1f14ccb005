use crate::error::StationError;
use groundstation_host::discovery;
use groundstation_host::metrics::{self, DiskMetrics, MemoryMetrics};
use serde::Serialize;
use std::path::PathBuf;

/// Host vitals of a snapshot; every field fails independently.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostHealth {
    pub cpu_temp_c: Option<f64>,
    pub load_1m: Option<f64>,
    pub mem_total_mb: Option<f64>,
    pub mem_used_mb: Option<f64>,
    pub disk_free_gb: Option<f64>,
    pub disk_used_pct: Option<f64>,
    pub ip_address: Option<String>,
}

pub struct SystemHealthProbe {
    thermal_zone: PathBuf,
    log_dir: PathBuf,
}

impl SystemHealthProbe {
    pub fn new(thermal_zone: PathBuf, log_dir: PathBuf) -> Self {
        Self { thermal_zone, log_dir }
    }

    pub async fn collect(&self, faults: &mut Vec<StationError>) -> HostHealth {
        let mut health = HostHealth::default();

        match metrics::cpu_temperature(&self.thermal_zone).await {
            Ok(t) => health.cpu_temp_c = Some(t),
            Err(e) => faults.push(StationError::probe("cpu_temp", e)),
        }

        match metrics::load_average_1m() {
            Ok(load) => health.load_1m = Some(load),
            Err(e) => faults.push(StationError::probe("load_1m", e)),
        }

        match MemoryMetrics::collect() {
            Ok(mem) => {
                health.mem_total_mb = Some(mem.total_mb);
                health.mem_used_mb = Some(mem.used_mb);
            }
            Err(e) => faults.push(StationError::probe("memory", e)),
        }

        // disk figures describe the filesystem the flight logs land on
        match DiskMetrics::for_path(&self.log_dir) {
            Ok(disk) => {
                health.disk_free_gb = Some(disk.free_gb);
                health.disk_used_pct = Some(disk.percent_used);
            }
            Err(e) => faults.push(StationError::probe("disk", e)),
        }

        match discovery::primary_ipv4() {
            Ok(ip) => health.ip_address = Some(ip.to_string()),
            Err(e) => faults.push(StationError::probe("ip_address", e)),
        }

        health
    }
}
