use groundstation_host::metrics::DEFAULT_THERMAL_ZONE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct StationConfig {
    pub http: HttpConf,
    pub logging: LogConf,
    pub battery: BatteryConf,
    pub sensor: SensorConf,
    pub probes: ProbeConf,
    pub sandbox: SandboxConf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LogConf {
    pub dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BatteryConf {
    pub cli: String,
    pub vbat_min_fallback_mv: i64,
    pub vbat_full_mv: i64,
    pub read_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SensorConf {
    pub command: Option<String>, // ex: "python3 /opt/groundstation/bme680_read.py"
    pub read_timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProbeConf {
    pub thermal_zone: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SandboxConf {
    pub home: Option<PathBuf>,
    pub timeout_secs: u64,
    pub max_command_len: usize,
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:5000".into() }
    }
}

impl Default for LogConf {
    fn default() -> Self {
        Self { dir: PathBuf::from("./flight_logs") }
    }
}

impl Default for BatteryConf {
    fn default() -> Self {
        Self {
            cli: "lifepo4wered-cli".into(),
            vbat_min_fallback_mv: crate::battery::VBAT_MIN_FALLBACK_MV,
            vbat_full_mv: crate::battery::VBAT_FULL_MV,
            read_timeout_secs: 5,
        }
    }
}

impl Default for SensorConf {
    fn default() -> Self {
        Self { command: None, read_timeout_secs: 5 }
    }
}

impl Default for ProbeConf {
    fn default() -> Self {
        Self { thermal_zone: PathBuf::from(DEFAULT_THERMAL_ZONE) }
    }
}

impl Default for SandboxConf {
    fn default() -> Self {
        Self {
            home: None,
            timeout_secs: crate::sandbox::COMMAND_TIMEOUT_SECS,
            max_command_len: crate::sandbox::MAX_COMMAND_LEN,
        }
    }
}

impl SandboxConf {
    /// Starting point of the command cursor
    pub fn home_dir(&self) -> PathBuf {
        self.home
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}

pub fn parse_config(txt: &str) -> Result<StationConfig, serde_yaml::Error> {
    if txt.trim().is_empty() {
        return Ok(StationConfig::default());
    }
    serde_yaml::from_str(txt)
}

pub async fn load_config() -> StationConfig {
    let path = std::env::var("GROUNDSTATION_CONFIG").unwrap_or_else(|_| "station.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        match parse_config(&txt) {
            Ok(cfg) => {
                info!("loaded config from {}", path);
                cfg
            }
            Err(e) => {
                warn!("invalid config {}: {}, using defaults", path, e);
                StationConfig::default()
            }
        }
    } else {
        warn!("no {} found, using default config", path);
        StationConfig::default()
    }
}
