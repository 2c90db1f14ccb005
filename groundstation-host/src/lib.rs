//! Ground station host adapters
//!
//! Everything that touches the operating system or external tools lives here:
//! - Host vitals (thermal, load, memory, disk)
//! - Network discovery
//! - Process execution with timeout
//! - Battery management tool and environmental sensor transports

pub mod discovery;
pub mod execution;
pub mod metrics;
pub mod power;
pub mod sensors;

pub use execution::{CommandExecutor, ExecutionResult};
pub use power::{BatteryParam, BatteryTool, Lifepo4weredCli};
pub use sensors::{HelperCommandSensor, NoSensor, RawEnvironment, SensorTransport};
