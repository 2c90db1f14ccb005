//! Battery management tool adapter
//!
//! The UPS board is queried through its command-line tool
//! (`lifepo4wered-cli get <PARAM>`), which prints a single integer,
//! sometimes decorated (`VBAT = 3310 mV`).

use crate::execution::CommandExecutor;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;

/// Parameters the battery tool can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatteryParam {
    /// Battery voltage, mV
    Vbat,
    /// Configured empty-battery voltage, mV
    VbatMin,
    /// Input voltage, mV
    Vin,
    /// 5V rail voltage, mV
    Vout,
    /// Load current, mA
    Iout,
}

impl BatteryParam {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryParam::Vbat => "VBAT",
            BatteryParam::VbatMin => "VBAT_MIN",
            BatteryParam::Vin => "VIN",
            BatteryParam::Vout => "VOUT",
            BatteryParam::Iout => "IOUT",
        }
    }
}

impl fmt::Display for BatteryParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of integer battery readings
#[async_trait]
pub trait BatteryTool: Send + Sync {
    async fn get(&self, param: BatteryParam) -> Result<i64>;
}

/// `lifepo4wered-cli` invoked as a child process
pub struct Lifepo4weredCli {
    program: String,
    timeout: Duration,
}

impl Lifepo4weredCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl BatteryTool for Lifepo4weredCli {
    async fn get(&self, param: BatteryParam) -> Result<i64> {
        let output = CommandExecutor::check_output(&self.program, &["get", param.as_str()], self.timeout).await?;
        parse_first_int(&output)
            .ok_or_else(|| anyhow!("Non-numeric output for {}: {:?}", param, output.trim()))
    }
}

static FIRST_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").expect("static regex"));

/// First (optionally negative) integer in `text`
pub fn parse_first_int(text: &str) -> Option<i64> {
    FIRST_INT.find(text)?.as_str().parse().ok()
}
