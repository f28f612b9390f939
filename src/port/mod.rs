//! Port abstraction layer for serial communication.
//!
//! Provides the `SerialDriver` trait, one driver per platform, an in-memory
//! mock for testing, and the `SerialPort` facade that callers use.

pub mod error;
pub mod mock;
pub mod serial_port;
pub mod settings;
pub mod traits;

#[cfg(unix)]
pub mod posix;

#[cfg(windows)]
pub mod windows;

#[cfg(not(any(unix, windows)))]
compile_error!("serial ports are only supported on POSIX and Windows targets");

pub use error::PortError;
pub use mock::MockDriver;
pub use serial_port::{NativeDriver, SerialPort};
pub use settings::*;
pub use traits::*;

#[cfg(unix)]
pub use posix::PosixDriver;

#[cfg(windows)]
pub use windows::WindowsDriver;
