//! Serial Port Library
//!
//! Open, configure, read, write and enumerate serial (UART) ports with one
//! interface on POSIX and Windows.
//!
//! # Modules
//!
//! - `port`: Settings model, the `SerialDriver` trait, platform drivers and the `SerialPort` facade
//! - `enumerate`: Discovery of the serial ports present on the machine
//! - `config`: Configuration management with TOML support
//!
//! # Example
//!
//! ```no_run
//! use serial_port::{Parity, SerialPort, StopBits};
//!
//! for info in SerialPort::enumerate_ports() {
//!     println!("{}", info);
//! }
//!
//! let mut port = SerialPort::from_parts("/dev/ttyUSB0", 115200, Parity::None, StopBits::One, false, 0, 500);
//! port.open()?;
//! port.write_string("hello\n")?;
//! let line = port.read_string()?;
//! # Ok::<(), serial_port::PortError>(())
//! ```

pub mod config;
pub mod enumerate;
pub mod port;

// Re-export commonly used types for convenience
pub use enumerate::enumerate_ports;
pub use port::{
    MockDriver, NativeDriver, Parity, PortError, PortInfo, SerialDriver, SerialPort, Settings,
    StopBits,
};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
