//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use crate::port::Settings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default port settings
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Hardware loopback test configuration
    pub testing: TestingConfig,
}

/// Serial port configuration section.
///
/// The port settings sit directly in `[serial]`; aliases live in
/// `[serial.port_aliases]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Settings used when the command line does not override them
    #[serde(flatten)]
    pub defaults: Settings,
    /// Short names for device paths, e.g. `gps = "/dev/ttyUSB0"`
    pub port_aliases: BTreeMap<String, String>,
}

impl SerialConfig {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.port_aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// Default settings with the port replaced by `name` (after alias resolution).
    pub fn settings_for(&self, name: &str) -> Settings {
        Settings {
            port_name: self.resolve_port(name),
            ..self.defaults.clone()
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter when `RUST_LOG` is unset: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    Pretty,
    /// Compact format
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Hardware loopback test configuration section.
///
/// `port_a` and `port_b` must be wired to each other (null-modem cable or a
/// virtual pair).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    /// First end of the loopback pair
    pub port_a: Option<String>,
    /// Second end of the loopback pair
    pub port_b: Option<String>,
    /// Baud rate used by the loopback tests
    pub baud: u32,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            port_a: None,
            port_b: None,
            baud: 115200,
        }
    }
}

impl TestingConfig {
    /// Both ends of the pair, if configured.
    pub fn loopback_pair(&self) -> Option<(&str, &str)> {
        Some((self.port_a.as_deref()?, self.port_b.as_deref()?))
    }
}
