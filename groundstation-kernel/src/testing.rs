//! Scripted collaborators for unit tests.

use crate::sandbox::CommandRunner;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use groundstation_host::{BatteryParam, BatteryTool, ExecutionResult, RawEnvironment, SensorTransport};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Battery board answering from a fixed table; unknown params fail.
#[derive(Default)]
pub struct FakeBatteryTool {
    pub values: Mutex<HashMap<BatteryParam, i64>>,
    pub calls: Mutex<Vec<BatteryParam>>,
}

impl FakeBatteryTool {
    pub fn with(values: &[(BatteryParam, i64)]) -> Arc<Self> {
        Arc::new(Self {
            values: Mutex::new(values.iter().copied().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl BatteryTool for FakeBatteryTool {
    async fn get(&self, param: BatteryParam) -> Result<i64> {
        self.calls.lock().push(param);
        self.values
            .lock()
            .get(&param)
            .copied()
            .ok_or_else(|| anyhow!("{} not connected", param))
    }
}

/// Sensor returning a fixed reading, or failing when `None`.
pub struct ScriptedSensor {
    pub reading: Mutex<Option<RawEnvironment>>,
}

impl ScriptedSensor {
    pub fn reading(raw: RawEnvironment) -> Arc<Self> {
        Arc::new(Self {
            reading: Mutex::new(Some(raw)),
        })
    }

    pub fn offline() -> Arc<Self> {
        Arc::new(Self {
            reading: Mutex::new(None),
        })
    }
}

#[async_trait]
impl SensorTransport for ScriptedSensor {
    async fn read(&self) -> Result<RawEnvironment> {
        self.reading
            .lock()
            .clone()
            .ok_or_else(|| anyhow!("I2C device 0x77 not responding"))
    }
}

/// Command runner that records what it was asked to run.
pub struct RecordingRunner {
    result: ExecutionResult,
    calls: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingRunner {
    fn new(result: ExecutionResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn succeeding(output: &str) -> Arc<Self> {
        Self::new(ExecutionResult {
            success: true,
            output: output.to_string(),
            error: None,
            exit_code: Some(0),
            timed_out: false,
            execution_time_ms: 3,
        })
    }

    pub fn failing(code: i32, stderr: &str) -> Arc<Self> {
        Self::new(ExecutionResult {
            success: false,
            output: format!("\nSTDERR:\n{}", stderr),
            error: Some(format!("Command 'ls x' returned non-zero exit status {}", code)),
            exit_code: Some(code),
            timed_out: false,
            execution_time_ms: 5,
        })
    }

    pub fn timing_out() -> Arc<Self> {
        Self::new(ExecutionResult {
            success: false,
            output: String::new(),
            error: Some("Command 'sleep 60' timed out after 15 seconds".to_string()),
            exit_code: None,
            timed_out: true,
            execution_time_ms: 15_000,
        })
    }

    pub fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, cwd: &Path, _timeout: Duration) -> ExecutionResult {
        self.calls.lock().push((command.to_string(), cwd.to_path_buf()));
        self.result.clone()
    }
}
