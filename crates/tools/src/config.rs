//! Configuration management for PMS tools

use crate::common::{load_config, save_config};
use anyhow::Result;
use clap::{Args, ValueEnum};
use pms_core::source::EofPolicy;
use pms_frame::command::ReportingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How readings are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reporting mode as a CLI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Active,
    Passive,
}

impl From<ModeArg> for ReportingMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Active => ReportingMode::Active,
            ModeArg::Passive => ReportingMode::Passive,
        }
    }
}

/// Sensor monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Serial device node or capture file
    pub port: Option<PathBuf>,
    /// Use synthesized readings instead of a sensor
    pub simulate: bool,
    /// Seed for simulated readings
    pub seed: Option<u64>,
    /// Budget for one read, in milliseconds
    pub timeout_ms: u64,
    /// Pause between readings when watching
    pub interval_ms: u64,
    /// Reads tried per reading before giving up
    pub max_attempts: u32,
    pub mode: ReportingMode,
    /// Treat zero-length reads as a read timeout (ttys with VTIME)
    pub eof_as_timeout: bool,
    pub wake_on_start: bool,
    pub sleep_on_exit: bool,
    pub format: OutputFormat,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            port: None,
            simulate: false,
            seed: None,
            timeout_ms: 10_000,
            interval_ms: 1_000,
            max_attempts: 5,
            mode: ReportingMode::Active,
            eof_as_timeout: false,
            wake_on_start: true,
            sleep_on_exit: true,
            format: OutputFormat::Text,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML or JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        save_config(self, path)
    }

    /// Reject values that make polling impossible
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("timeout_ms must be greater than zero");
        }
        if self.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn eof_policy(&self) -> EofPolicy {
        if self.eof_as_timeout {
            EofPolicy::Timeout
        } else {
            EofPolicy::Closed
        }
    }

    /// Apply command line overrides on top of file values
    pub fn apply(&mut self, args: &SourceArgs) {
        if let Some(port) = &args.port {
            self.port = Some(port.clone());
        }
        if args.simulate {
            self.simulate = true;
        }
        if let Some(seed) = args.seed {
            self.seed = Some(seed);
        }
        if let Some(timeout_ms) = args.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(max_attempts) = args.max_attempts {
            self.max_attempts = max_attempts;
        }
        if let Some(mode) = args.mode {
            self.mode = mode.into();
        }
        if args.eof_as_timeout {
            self.eof_as_timeout = true;
        }
        if args.no_wake {
            self.wake_on_start = false;
        }
        if args.no_sleep {
            self.sleep_on_exit = false;
        }
    }
}

/// Sensor source options
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Serial device node or capture file to read from
    #[arg(short, long, global = true)]
    pub port: Option<PathBuf>,

    /// Produce random readings without sensor hardware
    #[arg(long, global = true)]
    pub simulate: bool,

    /// Seed for simulated readings
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Read timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Reads tried per reading before giving up
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Sensor reporting mode
    #[arg(long, value_enum, global = true)]
    pub mode: Option<ModeArg>,

    /// Treat zero-length reads as timeouts instead of end of input
    #[arg(long, global = true)]
    pub eof_as_timeout: bool,

    /// Do not send a wake command on start
    #[arg(long, global = true)]
    pub no_wake: bool,

    /// Do not put the sensor to sleep on exit
    #[arg(long, global = true)]
    pub no_sleep: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::Builder;

    #[test]
    fn test_config_serialization() {
        let config = MonitorConfig {
            port: Some(PathBuf::from("/dev/serial0")),
            timeout_ms: 2_500,
            mode: ReportingMode::Passive,
            format: OutputFormat::Json,
            ..MonitorConfig::default()
        };

        let temp_file = Builder::new().suffix(".toml").tempfile().unwrap();
        config.save_to_file(temp_file.path()).unwrap();
        let loaded = MonitorConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config, loaded);

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("mode = \"passive\""));
    }

    #[test]
    fn test_json_config() {
        let temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(temp_file.path(), r#"{"simulate": true, "interval_ms": 250}"#).unwrap();

        let loaded = MonitorConfig::from_file(temp_file.path()).unwrap();
        assert!(loaded.simulate);
        assert_eq!(loaded.interval(), Duration::from_millis(250));
        assert_eq!(loaded.timeout_ms, 10_000);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: MonitorConfig = toml::from_str("port = \"/dev/ttyAMA0\"\n").unwrap();
        assert_eq!(config.port, Some(PathBuf::from("/dev/ttyAMA0")));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.mode, ReportingMode::Active);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = MonitorConfig {
            max_attempts: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MonitorConfig {
            timeout_ms: 0,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = MonitorConfig::default();
        let args = SourceArgs {
            simulate: true,
            timeout_ms: Some(300),
            mode: Some(ModeArg::Passive),
            eof_as_timeout: true,
            no_sleep: true,
            ..SourceArgs::default()
        };
        config.apply(&args);

        assert!(config.simulate);
        assert_eq!(config.timeout(), Duration::from_millis(300));
        assert_eq!(config.mode, ReportingMode::Passive);
        assert_eq!(config.eof_policy(), EofPolicy::Timeout);
        assert!(config.wake_on_start);
        assert!(!config.sleep_on_exit);
    }
}
