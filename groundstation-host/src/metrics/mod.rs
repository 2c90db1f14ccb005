//! Host vitals for the ground station
//!
//! Provides the individual OS probes used for the health panel:
//! - CPU temperature from the thermal zone
//! - 1-minute load average
//! - Memory usage statistics
//! - Disk usage for the filesystem holding a given path
//!
//! Each probe stands alone and returns its own failure.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::path::Path;
use sysinfo::System;

/// Default thermal zone on Raspberry Pi class boards
pub const DEFAULT_THERMAL_ZONE: &str = "/sys/class/thermal/thermal_zone0/temp";

/// Memory usage metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MemoryMetrics {
    pub total_mb: f64,
    pub used_mb: f64,
}

/// Disk usage for one filesystem
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiskMetrics {
    pub total_gb: f64,
    pub free_gb: f64,
    pub percent_used: f64,
}

const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Read the CPU temperature (°C) from a thermal zone file holding millidegrees
pub async fn cpu_temperature(thermal_path: &Path) -> Result<f64> {
    let raw = tokio::fs::read_to_string(thermal_path)
        .await
        .with_context(|| format!("Failed to read {}", thermal_path.display()))?;
    parse_millidegrees(&raw)
}

fn parse_millidegrees(raw: &str) -> Result<f64> {
    let millideg: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Unexpected thermal value {:?}", raw.trim()))?;
    Ok(millideg as f64 / 1000.0)
}

/// 1-minute load average
pub fn load_average_1m() -> Result<f64> {
    if !cfg!(unix) {
        return Err(anyhow!("Load average not available on this platform"));
    }
    Ok(System::load_average().one)
}

impl MemoryMetrics {
    pub fn collect() -> Result<Self> {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_bytes = sys.total_memory();
        if total_bytes == 0 {
            return Err(anyhow!("Memory totals unavailable"));
        }
        let used_bytes = total_bytes.saturating_sub(sys.available_memory());

        Ok(MemoryMetrics {
            total_mb: total_bytes as f64 / MB,
            used_mb: used_bytes as f64 / MB,
        })
    }
}

impl DiskMetrics {
    /// Usage of the filesystem that contains `path`
    #[cfg(unix)]
    pub fn for_path(path: &Path) -> Result<Self> {
        use nix::sys::statvfs::statvfs;

        let stat = statvfs(path).with_context(|| format!("statvfs failed for {}", path.display()))?;
        let fragment = stat.fragment_size() as u64;
        let total = stat.blocks() as u64 * fragment;
        let free = stat.blocks_available() as u64 * fragment;
        let used = (stat.blocks() as u64).saturating_sub(stat.blocks_free() as u64) * fragment;

        if total == 0 {
            return Err(anyhow!("Filesystem at {} reports zero size", path.display()));
        }

        Ok(DiskMetrics {
            total_gb: total as f64 / GB,
            free_gb: free as f64 / GB,
            percent_used: used as f64 * 100.0 / total as f64,
        })
    }

    #[cfg(not(unix))]
    pub fn for_path(path: &Path) -> Result<Self> {
        Err(anyhow!("Disk usage for {} not supported on this platform", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("48312\n").unwrap(), 48.312);
        assert!(parse_millidegrees("warm").is_err());
    }

    #[tokio::test]
    async fn test_cpu_temperature_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp");
        std::fs::write(&path, "51000\n").unwrap();

        assert_eq!(cpu_temperature(&path).await.unwrap(), 51.0);
        assert!(cpu_temperature(&dir.path().join("missing")).await.is_err());
    }

    #[test]
    fn test_memory_collection() {
        let memory = MemoryMetrics::collect().unwrap();
        assert!(memory.total_mb > 0.0);
        assert!(memory.used_mb <= memory.total_mb);
    }

    #[cfg(unix)]
    #[test]
    fn test_disk_usage_for_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let disk = DiskMetrics::for_path(dir.path()).unwrap();
        assert!(disk.total_gb > 0.0);
        assert!((0.0..=100.0).contains(&disk.percent_used));
        assert!(DiskMetrics::for_path(Path::new("/definitely/not/here")).is_err());
    }
}
