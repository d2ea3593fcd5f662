//! Common utilities and configuration for tools

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global options shared by every subcommand
#[derive(Debug, Clone, Default, Serialize, Deserialize, Args)]
pub struct GlobalConfig {
    /// Configuration file path (TOML or JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalConfig {
    /// Log level implied by the flags
    pub fn log_level(&self) -> tracing::Level {
        if self.debug {
            tracing::Level::DEBUG
        } else if self.verbose {
            tracing::Level::INFO
        } else {
            tracing::Level::WARN
        }
    }
}

/// Initialize logging based on configuration.
///
/// Logs go to stderr so stdout stays clean for readings and byte streams.
pub fn init_logging(config: &GlobalConfig) {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file
pub fn load_config<T: for<'a> Deserialize<'a>>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    if path.extension().and_then(|s| s.to_str()) == Some("json") {
        return serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path));
    }

    toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
}

/// Save configuration to file
pub fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = if path.extension().and_then(|s| s.to_str()) == Some("json") {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level() {
        let mut config = GlobalConfig::default();
        assert_eq!(config.log_level(), tracing::Level::WARN);
        config.verbose = true;
        assert_eq!(config.log_level(), tracing::Level::INFO);
        config.debug = true;
        assert_eq!(config.log_level(), tracing::Level::DEBUG);
    }

    #[test]
    fn test_load_missing_file() {
        let result: Result<GlobalConfig> = load_config(Path::new("/nonexistent/pms.toml"));
        assert!(result.is_err());
    }
}
