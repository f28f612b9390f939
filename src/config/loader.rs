//! Locating, loading and saving the configuration file.
//!
//! A configuration is a TOML file layered under `SERIAL_PORT_*` environment
//! overrides. Overrides are applied all-or-nothing: one bad variable rejects
//! the whole set.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use crate::port::{Parity, StopBits};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Names an explicit configuration file.
const CONFIG_PATH_VAR: &str = "SERIAL_PORT_CONFIG";

/// Prefix of every override variable.
const ENV_PREFIX: &str = "SERIAL_PORT_";

/// Looked up in the working directory.
const LOCAL_FILE: &str = "serial-port.toml";

/// Directory below the per-user configuration root.
const APP_DIR: &str = "serial-port";

/// File inside [`APP_DIR`].
const USER_FILE: &str = "config.toml";

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// `None` when no file was found and the built-in defaults are in use.
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl ConfigLoader {
    /// Load the first configuration file found, or the defaults.
    ///
    /// Search order:
    /// 1. the file named by `SERIAL_PORT_CONFIG`
    /// 2. `./serial-port.toml`
    /// 3. `$XDG_CONFIG_HOME/serial-port/config.toml`, falling back to
    ///    `~/.config/serial-port/config.toml` (`%APPDATA%\serial-port\config.toml` on Windows)
    ///
    /// Environment overrides are applied on top.
    pub fn load() -> ConfigResult<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(path),
            None => {
                debug!("No configuration file found, using defaults");
                Ok(Self {
                    config_path: None,
                    config: with_env_overrides(Config::default())?,
                })
            }
        }
    }

    /// Load `path`, which must exist, then apply environment overrides.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let config = with_env_overrides(read_config(path)?)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(Self {
            config_path: Some(path.to_path_buf()),
            config,
        })
    }

    /// Built-in defaults plus environment overrides.
    ///
    /// Never fails: if any override is invalid, none of them are applied.
    pub fn with_defaults() -> Self {
        let config = with_env_overrides(Config::default()).unwrap_or_else(|e| {
            warn!("Ignoring environment overrides: {}", e);
            Config::default()
        });
        Self {
            config_path: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Write the configuration back to the file it was loaded from.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self.config_path.as_deref().ok_or(ConfigError::NoSourcePath)?;
        write_config(&self.config, path)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        write_config(&self.config, path.as_ref())
    }
}

/// Candidate files in search order.
fn candidate_paths() -> Vec<PathBuf> {
    env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .into_iter()
        .chain(Some(PathBuf::from(LOCAL_FILE)))
        .chain(get_default_config_path())
        .collect()
}

/// The first existing configuration file, if any.
pub fn resolve_config_path() -> Option<PathBuf> {
    candidate_paths().into_iter().find(|path| path.is_file())
}

/// Per-user configuration root: `%APPDATA%`, `$XDG_CONFIG_HOME` or `~/.config`.
fn user_config_root() -> Option<PathBuf> {
    if cfg!(windows) {
        return env::var_os("APPDATA").map(PathBuf::from);
    }
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .filter(|dir| dir.is_absolute())
        .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))
}

/// `<user config root>/serial-port`.
pub fn get_default_config_dir() -> Option<PathBuf> {
    user_config_root().map(|root| root.join(APP_DIR))
}

/// `<user config root>/serial-port/config.toml`.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|dir| dir.join(USER_FILE))
}

fn read_config(path: &Path) -> ConfigResult<Config> {
    let text = fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Read {
            path: path.to_path_buf(),
            source,
        },
    })?;
    toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_config(config: &Config, path: &Path) -> ConfigResult<()> {
    let text = toml::to_string_pretty(config)?;
    let write_error = |source: io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_error)?;
    }
    fs::write(path, text).map_err(write_error)
}

/// One set `SERIAL_PORT_<KEY>` variable.
struct Override {
    var: String,
    value: String,
}

impl Override {
    fn lookup(key: &str) -> Option<Self> {
        let var = format!("{}{}", ENV_PREFIX, key);
        let value = env::var(&var).ok()?;
        Some(Self { var, value })
    }

    /// Set `key`, or else the unprefixed `legacy` variable.
    fn lookup_or_legacy(key: &str, legacy: &str) -> Option<Self> {
        Self::lookup(key).or_else(|| {
            env::var(legacy).ok().map(|value| Self {
                var: legacy.to_string(),
                value,
            })
        })
    }

    fn parse<T: FromStr>(&self, expected: &'static str) -> ConfigResult<T> {
        self.value.trim().parse().map_err(|_| self.invalid(expected))
    }

    fn flag(&self) -> ConfigResult<bool> {
        match self.value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(self.invalid("true, false, yes, no, on, off, 1 or 0")),
        }
    }

    fn invalid(&self, expected: &'static str) -> ConfigError {
        ConfigError::InvalidEnv {
            var: self.var.clone(),
            value: self.value.clone(),
            expected,
        }
    }
}

/// `config` with every `SERIAL_PORT_*` override applied, or the first invalid one.
///
/// Recognised variables:
/// - `SERIAL_PORT_SERIAL_PORT`, `_SERIAL_BAUD`, `_SERIAL_PARITY`, `_SERIAL_STOP_BITS`,
///   `_SERIAL_FLOW_CONTROL`, `_SERIAL_TIMEOUT_S`, `_SERIAL_TIMEOUT_MS`
/// - `SERIAL_PORT_LOGGING_LEVEL`, `_LOGGING_FORMAT`
/// - `SERIAL_PORT_TESTING_PORT_A` (or `TEST_PORT_A`), `_TESTING_PORT_B` (or `TEST_PORT_B`),
///   `_TESTING_BAUD` (or `TEST_BAUD`)
fn with_env_overrides(mut config: Config) -> ConfigResult<Config> {
    let serial = &mut config.serial.defaults;
    if let Some(var) = Override::lookup("SERIAL_PORT") {
        serial.port_name = var.value;
    }
    if let Some(var) = Override::lookup("SERIAL_BAUD") {
        serial.baud_rate = var.parse("a baud rate in bits per second")?;
    }
    if let Some(var) = Override::lookup("SERIAL_PARITY") {
        serial.parity = var.parse::<Parity>("none, odd or even")?;
    }
    if let Some(var) = Override::lookup("SERIAL_STOP_BITS") {
        serial.stop_bits = var.parse::<StopBits>("1, 2, one or two")?;
    }
    if let Some(var) = Override::lookup("SERIAL_FLOW_CONTROL") {
        serial.hardware_flow_control = var.flag()?;
    }
    if let Some(var) = Override::lookup("SERIAL_TIMEOUT_S") {
        serial.timeout_s = var.parse("a whole number of seconds")?;
    }
    if let Some(var) = Override::lookup("SERIAL_TIMEOUT_MS") {
        serial.timeout_ms = var.parse("a whole number of milliseconds")?;
    }

    if let Some(var) = Override::lookup("LOGGING_LEVEL") {
        config.logging.level = var.value;
    }
    if let Some(var) = Override::lookup("LOGGING_FORMAT") {
        config.logging.format = var.parse::<LogFormat>("json, pretty or compact")?;
    }

    if let Some(var) = Override::lookup_or_legacy("TESTING_PORT_A", "TEST_PORT_A") {
        config.testing.port_a = Some(var.value);
    }
    if let Some(var) = Override::lookup_or_legacy("TESTING_PORT_B", "TEST_PORT_B") {
        config.testing.port_b = Some(var.value);
    }
    if let Some(var) = Override::lookup_or_legacy("TESTING_BAUD", "TEST_BAUD") {
        config.testing.baud = var.parse("a baud rate in bits per second")?;
    }

    Ok(config)
}
