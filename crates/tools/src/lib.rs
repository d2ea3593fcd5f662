//! PMS Tools library

pub mod config;
pub mod common;
pub mod sensor;
pub mod monitor;

pub use config::{MonitorConfig, OutputFormat, SourceArgs};
pub use common::{init_logging, GlobalConfig};
pub use sensor::{HardwareSensor, SensorHandle};
pub use monitor::{Monitor, Sample};
