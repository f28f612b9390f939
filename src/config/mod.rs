//! Configuration module for serial-port.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `SERIAL_PORT_CONFIG` environment variable (explicit path)
//! 2. `./serial-port.toml` (current directory)
//! 3. `~/.config/serial-port/config.toml` (XDG on Linux/macOS)
//! 4. `%APPDATA%\serial-port\config.toml` (Windows)
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `SERIAL_PORT_<SECTION>_<KEY>`
//!
//! Examples:
//! - `SERIAL_PORT_SERIAL_PORT=/dev/ttyUSB0`
//! - `SERIAL_PORT_SERIAL_BAUD=115200`
//! - `SERIAL_PORT_LOGGING_LEVEL=debug`
//!
//! The loopback test ports also honour the legacy `TEST_PORT_A` and `TEST_PORT_B`.
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_port::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let config = loader.config();
//!
//! println!("Default port: {}", config.serial.defaults.port_name);
//! println!("Default baud: {}", config.serial.defaults.baud_rate);
//! # Ok::<(), serial_port::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig, TestingConfig};
