//! Discovery of the serial ports currently present on the system.
//!
//! Enumeration is stateless and needs no open port. A discovery source that
//! cannot be read yields an empty list rather than an error.

use crate::port::PortInfo;
use tracing::debug;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(windows)]
mod windows;

/// Snapshot of the available ports, sorted by `short_name`.
pub fn enumerate_ports() -> Vec<PortInfo> {
    let ports = platform_ports();
    debug!("Found {} serial port(s)", ports.len());
    ports
}

#[cfg(target_os = "linux")]
fn platform_ports() -> Vec<PortInfo> {
    linux::enumerate()
}

#[cfg(windows)]
fn platform_ports() -> Vec<PortInfo> {
    windows::enumerate()
}

#[cfg(not(any(target_os = "linux", windows)))]
fn platform_ports() -> Vec<PortInfo> {
    debug!("Port enumeration is not available on this platform");
    Vec::new()
}
