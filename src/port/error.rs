//! Port-specific error types.
//!
//! Every failure of the port layer is an I/O failure with a descriptive message.
//! The variants only exist so callers can tell apart which step failed; all of
//! them collapse into a single [`std::io::Error`] through the `From` impl below.

use std::io;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The device could not be opened (missing path, permissions, busy).
    #[error("Could not open serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },

    /// The requested baud rate is not in the platform's supported set.
    #[error("Invalid baud rate requested: {0}")]
    UnsupportedBaudRate(u32),

    /// Reading or applying the native line configuration failed.
    #[error("Error applying port settings on '{port}': {source}")]
    Configure {
        port: String,
        #[source]
        source: io::Error,
    },

    /// `SetCommTimeouts` failed. POSIX applies timing with the line settings.
    #[error("Error setting the timeouts on '{port}': {source}")]
    Timeouts {
        port: String,
        #[source]
        source: io::Error,
    },

    /// Discarding the receive queue failed.
    #[error("Failed to flush RX buffer of '{port}': {source}")]
    Flush {
        port: String,
        #[source]
        source: io::Error,
    },

    /// Attempted to use a port that's not open.
    #[error("Port is not open")]
    NotOpen,

    /// A read or write on an open port failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl PortError {
    /// Create an Open error for the given port.
    pub(crate) fn open(port: impl Into<String>, source: io::Error) -> Self {
        Self::Open {
            port: port.into(),
            source,
        }
    }

    pub(crate) fn configure(port: impl Into<String>, source: io::Error) -> Self {
        Self::Configure {
            port: port.into(),
            source,
        }
    }

    #[cfg(windows)]
    pub(crate) fn timeouts(port: impl Into<String>, source: io::Error) -> Self {
        Self::Timeouts {
            port: port.into(),
            source,
        }
    }

    pub(crate) fn flush(port: impl Into<String>, source: io::Error) -> Self {
        Self::Flush {
            port: port.into(),
            source,
        }
    }

    /// The [`io::ErrorKind`] this error maps to.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::UnsupportedBaudRate(_) => io::ErrorKind::InvalidInput,
            Self::NotOpen => io::ErrorKind::NotConnected,
            Self::Open { source, .. }
            | Self::Configure { source, .. }
            | Self::Timeouts { source, .. }
            | Self::Flush { source, .. }
            | Self::Io(source) => source.kind(),
        }
    }
}

impl From<PortError> for io::Error {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Io(e) => e,
            other => io::Error::new(other.kind(), other.to_string()),
        }
    }
}
