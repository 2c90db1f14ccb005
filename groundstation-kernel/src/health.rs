use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Self-report of the station service, served on `/system/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceHealth {
    pub uptime_seconds: u64,
    pub recording: bool,
    pub snapshots_served: u64,
    pub rows_logged: u64,
    pub log_failures: u64,
    pub commands_executed: u64,
    pub commands_blocked: u64,
    pub memory_usage_mb: Option<f32>,
}

#[derive(Default)]
struct Counters {
    snapshots_served: AtomicU64,
    rows_logged: AtomicU64,
    log_failures: AtomicU64,
    commands_executed: AtomicU64,
    commands_blocked: AtomicU64,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    counters: Arc<Counters>,
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthTracker {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn snapshot_served(&self) {
        self.counters.snapshots_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn row_logged(&self) {
        self.counters.rows_logged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn log_failed(&self) {
        self.counters.log_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_executed(&self) {
        self.counters.commands_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_blocked(&self) {
        self.counters.commands_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_health(&self, recording: bool) -> ServiceHealth {
        let c = &self.counters;
        ServiceHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            recording,
            snapshots_served: c.snapshots_served.load(Ordering::Relaxed),
            rows_logged: c.rows_logged.load(Ordering::Relaxed),
            log_failures: c.log_failures.load(Ordering::Relaxed),
            commands_executed: c.commands_executed.load(Ordering::Relaxed),
            commands_blocked: c.commands_blocked.load(Ordering::Relaxed),
            memory_usage_mb: get_memory_usage_mb(),
        }
    }
}

fn get_memory_usage_mb() -> Option<f32> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string("/proc/self/status").ok()?;
        let kb = status
            .lines()
            .find(|line| line.starts_with("VmRSS:"))?
            .split_whitespace()
            .nth(1)?
            .parse::<u64>()
            .ok()?;
        Some(kb as f32 / 1024.0)
    }

    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}
