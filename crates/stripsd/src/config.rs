//! Configuration file parsing and structures.
//!
//! stripsd uses TOML for declarative configuration: logging, the simulated
//! host, and one table per device with its variant and stored settings.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::reconcile::NodeInfo;
use crate::settings::Settings;
use crate::variant::DeviceVariant;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub host: HostConfig,

    /// Key = device id
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceConfig>,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"stripsd::scene" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Filter applying `level` by default and `overrides` per target
    pub fn targets(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

/// Behaviour of the in-memory host
#[derive(Debug, Deserialize)]
pub struct HostConfig {
    /// Delay before the flow-trigger registry reports ready
    #[serde(default = "default_ready_delay_ms")]
    pub ready_delay_ms: u64,
}

fn default_ready_delay_ms() -> u64 {
    100
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            ready_delay_ms: default_ready_delay_ms(),
        }
    }
}

/// One paired Strips device
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    pub variant: DeviceVariant,

    /// The node has a tamper switch
    #[serde(default)]
    pub tamper: bool,

    /// Stored settings the device starts with
    ///
    /// Kept as an opaque TOML table and converted to JSON settings on load.
    #[serde(default)]
    pub settings: toml::Table,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }
}

impl DeviceConfig {
    /// Convert the opaque TOML settings to JSON settings
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let json_str = serde_json::to_string(&self.settings).map_err(ConfigError::JsonConversion)?;

        serde_json::from_str(&json_str).map_err(ConfigError::JsonConversion)
    }

    pub fn node(&self) -> NodeInfo {
        NodeInfo {
            tamper: self.tamper,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to convert settings to JSON: {0}")]
    JsonConversion(#[source] serde_json::Error),
}
