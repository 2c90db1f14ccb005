//! Battery state of charge from the UPS board.
//!
//! LiFePO4 cells sit on a very flat discharge curve, so the percentage is a
//! plain linear map between the configured empty floor and a fixed full
//! voltage. The floor comes from the board once and is cached.

use crate::error::StationError;
use groundstation_host::{BatteryParam, BatteryTool};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Voltage treated as a full battery, mV
pub const VBAT_FULL_MV: i64 = 3500;
/// Empty floor used when the board cannot report `VBAT_MIN`, mV
pub const VBAT_MIN_FALLBACK_MV: i64 = 2950;

/// Power-supply fields of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatteryReport {
    pub battery_percent: Option<u8>,
    pub battery_mv: Option<i64>,
    pub vin_mv: Option<i64>,
    pub vout_mv: Option<i64>,
    pub load_current_ma: Option<i64>,
}

/// Map a battery voltage onto 0–100 %.
pub fn percent_from_mv(mv: i64, floor_mv: i64, full_mv: i64) -> u8 {
    if mv <= floor_mv {
        0
    } else if mv >= full_mv {
        100
    } else {
        let pct = (mv - floor_mv) as f64 * 100.0 / (full_mv - floor_mv) as f64;
        pct.round() as u8
    }
}

pub struct BatteryEstimator {
    tool: Arc<dyn BatteryTool>,
    floor_mv: OnceCell<i64>,
    fallback_floor_mv: i64,
    full_mv: i64,
}

impl BatteryEstimator {
    pub fn new(tool: Arc<dyn BatteryTool>, fallback_floor_mv: i64, full_mv: i64) -> Self {
        Self {
            tool,
            floor_mv: OnceCell::new(),
            fallback_floor_mv,
            full_mv,
        }
    }

    /// Empty-battery floor, queried from the board on first use only.
    pub async fn floor_mv(&self) -> i64 {
        *self
            .floor_mv
            .get_or_init(|| async {
                match self.tool.get(BatteryParam::VbatMin).await {
                    Ok(mv) if mv < self.full_mv => {
                        debug!("battery floor calibrated at {} mV", mv);
                        mv
                    }
                    Ok(mv) => {
                        warn!(
                            "VBAT_MIN {} mV is not below full charge {} mV, using fallback {} mV",
                            mv, self.full_mv, self.fallback_floor_mv
                        );
                        self.fallback_floor_mv
                    }
                    Err(e) => {
                        warn!("VBAT_MIN unavailable ({:#}), using fallback {} mV", e, self.fallback_floor_mv);
                        self.fallback_floor_mv
                    }
                }
            })
            .await
    }

    /// Current charge as `(percent, raw mV)`.
    pub async fn estimate(&self) -> Result<(u8, i64), StationError> {
        let mv = self
            .tool
            .get(BatteryParam::Vbat)
            .await
            .map_err(|e| StationError::battery(BatteryParam::Vbat, e))?;
        let floor = self.floor_mv().await;
        Ok((percent_from_mv(mv, floor, self.full_mv), mv))
    }

    /// Charge plus the extended rail readings; each field fails on its own.
    pub async fn read(&self, faults: &mut Vec<StationError>) -> BatteryReport {
        let mut report = BatteryReport::default();

        match self.estimate().await {
            Ok((pct, mv)) => {
                report.battery_percent = Some(pct);
                report.battery_mv = Some(mv);
            }
            Err(e) => faults.push(e),
        }

        report.vin_mv = self.optional(BatteryParam::Vin, faults).await;
        report.vout_mv = self.optional(BatteryParam::Vout, faults).await;
        report.load_current_ma = self.optional(BatteryParam::Iout, faults).await;
        report
    }

    async fn optional(&self, param: BatteryParam, faults: &mut Vec<StationError>) -> Option<i64> {
        match self.tool.get(param).await {
            Ok(v) => Some(v),
            Err(e) => {
                faults.push(StationError::battery(param, e));
                None
            }
        }
    }
}
