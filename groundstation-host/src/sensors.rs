//! Environmental sensor transport
//!
//! The BME680 sits on I2C behind a small helper program that prints one JSON
//! object per invocation. Any field the helper cannot read is left out.

use crate::execution::CommandExecutor;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw environmental reading, before any derivation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEnvironment {
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure_hpa: Option<f64>,
    #[serde(default)]
    pub gas_ohms: Option<f64>,
    #[serde(default)]
    pub altitude_m: Option<f64>,
}

/// Source of raw environmental readings
#[async_trait]
pub trait SensorTransport: Send + Sync {
    async fn read(&self) -> Result<RawEnvironment>;
}

/// Helper program emitting a JSON `RawEnvironment`
pub struct HelperCommandSensor {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl HelperCommandSensor {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }
}

#[async_trait]
impl SensorTransport for HelperCommandSensor {
    async fn read(&self) -> Result<RawEnvironment> {
        let args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        let output = CommandExecutor::check_output(&self.program, &args, self.timeout).await?;
        parse_reading(&output)
    }
}

/// Placeholder used when no sensor helper is configured
pub struct NoSensor;

#[async_trait]
impl SensorTransport for NoSensor {
    async fn read(&self) -> Result<RawEnvironment> {
        Err(anyhow!("No sensor transport configured"))
    }
}

fn parse_reading(output: &str) -> Result<RawEnvironment> {
    serde_json::from_str(output.trim()).context("Sensor helper returned malformed JSON")
}
