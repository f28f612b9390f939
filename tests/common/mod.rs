//! Shared test utilities for serial-port tests.
//!
//! This module provides common test infrastructure including:
//! - Opened mock loopback pairs
//! - Pseudo-terminal pairs standing in for a null-modem cable (Linux)
//! - Hardware loopback ports from the `[testing]` configuration

#![allow(dead_code, unused_imports)]

use serial_port::config::ConfigLoader;
use serial_port::{MockDriver, SerialPort, Settings};

/// Message used by the loopback tests.
pub const TEST_MESSAGE: &str = "I am a test!\r\n";

/// Two opened mock ports wired to each other.
pub fn open_mock_pair(baud_rate: u32) -> (SerialPort<MockDriver>, SerialPort<MockDriver>) {
    let (a, b) = MockDriver::pair(
        Settings::new("MOCK0", baud_rate),
        Settings::new("MOCK1", baud_rate),
    );
    let mut a = SerialPort::with_driver(a);
    let mut b = SerialPort::with_driver(b);
    a.open().expect("open MOCK0");
    b.open().expect("open MOCK1");
    (a, b)
}

/// Ports and baud rate for the hardware loopback tests.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwarePair {
    pub port_a: String,
    pub port_b: String,
    pub baud: u32,
}

/// Hardware loopback pair from the `[testing]` configuration section.
///
/// `SERIAL_PORT_TESTING_PORT_A/B` (or the legacy `TEST_PORT_A/B`) and
/// `SERIAL_PORT_TESTING_BAUD` override the file. Prints a note and returns
/// `None` when either port is missing.
pub fn hardware_pair() -> Option<HardwarePair> {
    let testing = match ConfigLoader::load() {
        Ok(loader) => loader.into_config().testing,
        Err(e) => {
            println!("Ignoring configuration: {}", e);
            ConfigLoader::with_defaults().into_config().testing
        }
    };
    let Some((port_a, port_b)) = testing.loopback_pair() else {
        println!("Skipping hardware test: [testing] port_a and port_b must both be set");
        return None;
    };
    Some(HardwarePair {
        port_a: port_a.to_string(),
        port_b: port_b.to_string(),
        baud: testing.baud,
    })
}

#[cfg(target_os = "linux")]
pub use pty::{open_pty, Pty};

#[cfg(target_os = "linux")]
mod pty {
    use std::ffi::CStr;
    use std::fs::File;
    use std::io;
    use std::os::fd::{FromRawFd, OwnedFd};

    /// A pseudo-terminal: `master` is one end of the wire, `slave_path` the
    /// device node the port under test opens.
    pub struct Pty {
        pub master: File,
        pub slave_path: String,
    }

    fn check(ret: libc::c_int) -> io::Result<libc::c_int> {
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    /// Allocate a new pseudo-terminal.
    pub fn open_pty() -> io::Result<Pty> {
        let fd = check(unsafe { libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY) })?;
        let master = unsafe { OwnedFd::from_raw_fd(fd) };

        check(unsafe { libc::grantpt(fd) })?;
        check(unsafe { libc::unlockpt(fd) })?;

        let mut name = [0 as libc::c_char; 128];
        let ret = unsafe { libc::ptsname_r(fd, name.as_mut_ptr(), name.len()) };
        if ret != 0 {
            return Err(io::Error::from_raw_os_error(ret));
        }
        let slave_path = unsafe { CStr::from_ptr(name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        // Keep the slave side raw until the port under test configures it.
        let mut attrs: libc::termios = unsafe { std::mem::zeroed() };
        check(unsafe { libc::tcgetattr(fd, &mut attrs) })?;
        unsafe { libc::cfmakeraw(&mut attrs) };
        check(unsafe { libc::tcsetattr(fd, libc::TCSANOW, &attrs) })?;

        Ok(Pty {
            master: File::from(master),
            slave_path,
        })
    }
}
