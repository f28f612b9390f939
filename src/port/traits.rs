//! Core trait for serial port drivers.
//!
//! Defines the `SerialDriver` trait implemented by the platform drivers and by
//! the in-memory [`MockDriver`](super::MockDriver), so the facade and the line
//! helpers work the same on all of them.

use super::error::PortError;
use super::settings::Settings;

/// A driver owning at most one native serial port handle.
///
/// Implementations must release their handle in `Drop`. All I/O is blocking and
/// single-shot: short and zero-length transfers are normal results, and nothing
/// is retried internally.
pub trait SerialDriver: Send + std::fmt::Debug {
    /// The settings this driver applies on `open()`.
    fn settings(&self) -> &Settings;

    /// Acquire the native handle and apply the settings.
    ///
    /// An already open driver is closed first. If applying the settings fails
    /// the handle is released again and the driver stays closed.
    fn open(&mut self) -> Result<(), PortError>;

    /// Release the native handle. Closing a closed driver is a no-op.
    fn close(&mut self);

    /// Whether a native handle is currently held.
    fn is_open(&self) -> bool;

    /// Number of received bytes not yet consumed by a read.
    ///
    /// Returns 0 when the driver is closed.
    fn bytes_available(&mut self) -> Result<usize, PortError>;

    /// Discard all received bytes that have not been read yet.
    fn flush_input(&mut self) -> Result<(), PortError>;

    /// One blocking read of up to `buffer.len()` bytes.
    ///
    /// Returns the number of bytes actually read, which may be less than
    /// requested or zero.
    fn read_data(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// One blocking write of up to `data.len()` bytes.
    ///
    /// Returns the number of bytes actually written. A closed driver writes
    /// nothing and returns `Ok(0)`.
    fn write_data(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read until a `'\n'` byte arrives, one byte at a time.
    ///
    /// The terminator is part of the result. There is no upper bound: without
    /// a configured timeout or incoming newline this blocks forever. Invalid
    /// UTF-8 is replaced with U+FFFD.
    fn read_string(&mut self) -> Result<String, PortError> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            if self.read_data(&mut byte)? == 0 {
                continue;
            }
            line.push(byte[0]);
            if byte[0] == b'\n' {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Write the bytes of `text` with a single `write_data` call.
    fn write_string(&mut self, text: &str) -> Result<usize, PortError> {
        self.write_data(text.as_bytes())
    }
}
