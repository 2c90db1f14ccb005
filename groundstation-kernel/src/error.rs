use groundstation_host::BatteryParam;
use thiserror::Error;

/// Every failure the station can observe.
///
/// Collaborator failures (sensor, battery, host probes) never abort a
/// snapshot: they are turned into an absent field plus a fault string.
/// Recorder and sandbox failures are reported to the operator as text.
#[derive(Debug, Error)]
pub enum StationError {
    #[error("sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("battery read unavailable ({param}): {reason}")]
    BatteryReadUnavailable { param: BatteryParam, reason: String },

    #[error("{metric} undefined: {reason}")]
    MetricUndefined { metric: &'static str, reason: String },

    #[error("host probe {probe} unavailable: {reason}")]
    HostProbeUnavailable { probe: &'static str, reason: String },

    #[error("log I/O failure: {0}")]
    LogIo(#[from] std::io::Error),

    #[error("Command timed out after {0} seconds")]
    CommandTimeout(u64),

    #[error("Blocked: dangerous command")]
    CommandBlocked,

    #[error("Command too long")]
    CommandTooLong,

    #[error("cd: {0}")]
    PathResolution(String),

    #[error("{0}")]
    CommandFailed(String),
}

impl From<csv::Error> for StationError {
    fn from(e: csv::Error) -> Self {
        StationError::LogIo(e.into())
    }
}

impl StationError {
    pub fn battery(param: BatteryParam, err: anyhow::Error) -> Self {
        StationError::BatteryReadUnavailable {
            param,
            reason: format!("{err:#}"),
        }
    }

    pub fn probe(probe: &'static str, err: anyhow::Error) -> Self {
        StationError::HostProbeUnavailable {
            probe,
            reason: format!("{err:#}"),
        }
    }
}
