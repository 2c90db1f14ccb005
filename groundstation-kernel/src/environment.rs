//! Derived environmental indices.
//!
//! Three independent derivations share one raw BME680 reading:
//! - dew point (Magnus-Tetens)
//! - a heuristic fire-risk index, 0–100
//! - an air-quality index relative to the first gas reading, 0–250
//!
//! Missing or out-of-domain inputs give absent outputs, never errors.

use crate::error::StationError;
use groundstation_host::RawEnvironment;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tracing::info;

const MAGNUS_A: f64 = 17.62;
const MAGNUS_B: f64 = 243.12;

/// Dew point in °C, absent when humidity is not positive or the result is not finite.
pub fn dew_point(temp_c: f64, rh: f64) -> Option<f64> {
    if !temp_c.is_finite() || !rh.is_finite() || rh <= 0.0 {
        return None;
    }
    let gamma = (rh / 100.0).ln() + (MAGNUS_A * temp_c) / (MAGNUS_B + temp_c);
    Some((MAGNUS_B * gamma) / (MAGNUS_A - gamma)).filter(|dew| dew.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum FireRiskLevel {
    Low,
    Moderate,
    High,
    #[serde(rename = "Very High")]
    VeryHigh,
    Extreme,
}

impl FireRiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            FireRiskLevel::Low
        } else if score < 40.0 {
            FireRiskLevel::Moderate
        } else if score < 60.0 {
            FireRiskLevel::High
        } else if score < 80.0 {
            FireRiskLevel::VeryHigh
        } else {
            FireRiskLevel::Extreme
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FireRiskLevel::Low => "Low",
            FireRiskLevel::Moderate => "Moderate",
            FireRiskLevel::High => "High",
            FireRiskLevel::VeryHigh => "Very High",
            FireRiskLevel::Extreme => "Extreme",
        }
    }
}

impl fmt::Display for FireRiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted dryness/heat score: 50% humidity, 30% temperature, 20% dew spread.
pub fn fire_risk_index(temp_c: f64, rh: f64, dew_point_c: Option<f64>) -> (f64, FireRiskLevel) {
    let dryness = 1.0 - (rh / 100.0).clamp(0.0, 1.0);
    let heat = ((temp_c - 5.0) / 30.0).clamp(0.0, 1.0);
    // undefined dew point contributes no spread
    let spread = dew_point_c.map_or(0.0, |dew| ((temp_c - dew) / 15.0).clamp(0.0, 1.0));

    let score = ((0.5 * dryness + 0.3 * heat + 0.2 * spread) * 100.0).clamp(0.0, 100.0);
    (score, FireRiskLevel::from_score(score))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AirQualityLevel {
    Good,
    Moderate,
    #[serde(rename = "Unhealthy-SG")]
    UnhealthySensitive,
    Unhealthy,
    #[serde(rename = "Very Unhealthy")]
    VeryUnhealthy,
}

impl AirQualityLevel {
    pub fn from_index(index: u16) -> Self {
        match index {
            0..=50 => AirQualityLevel::Good,
            51..=100 => AirQualityLevel::Moderate,
            101..=150 => AirQualityLevel::UnhealthySensitive,
            151..=200 => AirQualityLevel::Unhealthy,
            _ => AirQualityLevel::VeryUnhealthy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AirQualityLevel::Good => "Good",
            AirQualityLevel::Moderate => "Moderate",
            AirQualityLevel::UnhealthySensitive => "Unhealthy-SG",
            AirQualityLevel::Unhealthy => "Unhealthy",
            AirQualityLevel::VeryUnhealthy => "Very Unhealthy",
        }
    }
}

impl fmt::Display for AirQualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index for a gas reading against a known clean-air baseline.
pub fn air_quality_from_ratio(baseline_ohms: f64, gas_ohms: f64) -> (u16, AirQualityLevel) {
    // lower resistance means more VOCs
    let delta = (baseline_ohms / gas_ohms - 1.0).clamp(-1.0, 4.0);
    let index = (50.0 + 50.0 * delta).round().clamp(0.0, 250.0) as u16;
    (index, AirQualityLevel::from_index(index))
}

/// Raw plus derived environmental fields of a snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentReport {
    pub temperature_c: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub gas_ohms: Option<f64>,
    pub dew_point_c: Option<f64>,
    pub altitude_m: Option<f64>,
    pub fire_risk_index: Option<f64>,
    pub fire_risk_level: Option<FireRiskLevel>,
    pub air_quality_index: Option<u16>,
    pub air_quality_level: Option<AirQualityLevel>,
}

/// Owns the air-quality baseline; everything else is stateless.
#[derive(Default)]
pub struct EnvironmentEngine {
    gas_baseline: Mutex<Option<f64>>,
}

impl EnvironmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn baseline(&self) -> Option<f64> {
        *self.gas_baseline.lock()
    }

    /// The first positive reading becomes the baseline and scores (50, Good).
    pub fn estimate_aqi(&self, gas_ohms: Option<f64>) -> Option<(u16, AirQualityLevel)> {
        let gas = finite(gas_ohms).filter(|g| *g > 0.0)?;

        let mut baseline = self.gas_baseline.lock();
        match *baseline {
            Some(reference) => Some(air_quality_from_ratio(reference, gas)),
            None => {
                info!("air quality baseline set at {:.0} ohms", gas);
                *baseline = Some(gas);
                Some((50, AirQualityLevel::Good))
            }
        }
    }

    pub fn derive(&self, raw: &RawEnvironment, faults: &mut Vec<StationError>) -> EnvironmentReport {
        let temperature_c = finite(raw.temperature_c);
        let humidity = finite(raw.humidity);

        let dew_point_c = match (temperature_c, humidity) {
            (Some(t), Some(rh)) => {
                let dew = dew_point(t, rh);
                if dew.is_none() {
                    faults.push(StationError::MetricUndefined {
                        metric: "dew_point_c",
                        reason: format!("no finite value at {t} °C, {rh}% humidity"),
                    });
                }
                dew
            }
            _ => None,
        };

        let fire_risk = match (temperature_c, humidity) {
            (Some(t), Some(rh)) => Some(fire_risk_index(t, rh, dew_point_c)),
            _ => None,
        };

        let air_quality = self.estimate_aqi(raw.gas_ohms);

        EnvironmentReport {
            temperature_c,
            humidity,
            pressure_hpa: finite(raw.pressure_hpa),
            gas_ohms: finite(raw.gas_ohms),
            dew_point_c,
            altitude_m: finite(raw.altitude_m),
            fire_risk_index: fire_risk.map(|(score, _)| score),
            fire_risk_level: fire_risk.map(|(_, level)| level),
            air_quality_index: air_quality.map(|(index, _)| index),
            air_quality_level: air_quality.map(|(_, level)| level),
        }
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}
