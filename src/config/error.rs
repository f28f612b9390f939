//! Errors raised while locating, reading, writing or overriding the configuration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested file does not exist.
    #[error("No configuration file at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid TOML in {}: {}", .path.display(), .source)]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot encode configuration as TOML: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Cannot write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A `SERIAL_PORT_*` variable holds a value outside its accepted set.
    #[error("{var}={value:?} is invalid, expected {expected}")]
    InvalidEnv {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// `save()` on a configuration that was not read from a file.
    #[error("Configuration has no source file; save it with an explicit path")]
    NoSourcePath,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_invalid_env_names_accepted_values() {
        let err = ConfigError::InvalidEnv {
            var: "SERIAL_PORT_SERIAL_PARITY".to_string(),
            value: "mark".to_string(),
            expected: "none, odd or even",
        };
        assert_eq!(
            err.to_string(),
            "SERIAL_PORT_SERIAL_PARITY=\"mark\" is invalid, expected none, odd or even"
        );
    }

    #[test]
    fn test_not_found_shows_path() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/serial-port.toml"));
        assert_eq!(err.to_string(), "No configuration file at /etc/serial-port.toml");
    }
}
