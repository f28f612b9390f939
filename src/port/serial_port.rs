//! The `SerialPort` facade.
//!
//! `SerialPort` owns exactly one driver and forwards every operation to it
//! unchanged. The driver for the running platform is chosen at compile time
//! through [`NativeDriver`]; any other [`SerialDriver`] can be plugged in with
//! [`SerialPort::with_driver`].

use super::error::PortError;
use super::settings::{Parity, PortInfo, Settings, StopBits};
use super::traits::SerialDriver;
use std::fmt;
use std::io;

/// The driver compiled for this platform.
#[cfg(unix)]
pub type NativeDriver = super::posix::PosixDriver;

/// The driver compiled for this platform.
#[cfg(windows)]
pub type NativeDriver = super::windows::WindowsDriver;

/// A serial port.
///
/// Constructing a port never touches the device; call [`open`](Self::open).
/// The port is closed when dropped.
///
/// # Example
/// ```no_run
/// use serial_port::{Settings, SerialPort};
///
/// let mut port = SerialPort::with_settings(Settings::new("/dev/ttyUSB0", 115200));
/// port.open()?;
/// port.write_string("AT\r\n")?;
/// let reply = port.read_string()?;
/// # Ok::<(), serial_port::PortError>(())
/// ```
#[derive(Debug)]
pub struct SerialPort<D: SerialDriver = NativeDriver> {
    driver: D,
}

impl SerialPort<NativeDriver> {
    /// Port on the platform default device, 9600-8-N-1.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Port using the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            driver: NativeDriver::new(settings),
        }
    }

    /// Port from discrete parameters.
    pub fn from_parts(
        port_name: impl Into<String>,
        baud_rate: u32,
        parity: Parity,
        stop_bits: StopBits,
        hardware_flow_control: bool,
        timeout_s: u64,
        timeout_ms: u64,
    ) -> Self {
        Self::with_settings(Settings::from_parts(
            port_name,
            baud_rate,
            parity,
            stop_bits,
            hardware_flow_control,
            timeout_s,
            timeout_ms,
        ))
    }

    /// Snapshot of the ports currently present, sorted by short name.
    pub fn enumerate_ports() -> Vec<PortInfo> {
        crate::enumerate::enumerate_ports()
    }
}

impl Default for SerialPort<NativeDriver> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: SerialDriver> SerialPort<D> {
    /// Port backed by an explicit driver.
    pub fn with_driver(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Open the port with its settings, closing it first if already open.
    pub fn open(&mut self) -> Result<(), PortError> {
        self.driver.open()
    }

    /// Close the port. Safe to call any number of times.
    pub fn close(&mut self) {
        self.driver.close()
    }

    pub fn is_open(&self) -> bool {
        self.driver.is_open()
    }

    /// The settings applied on `open()`.
    pub fn settings(&self) -> &Settings {
        self.driver.settings()
    }

    /// Number of received bytes waiting to be read.
    pub fn bytes_available(&mut self) -> Result<usize, PortError> {
        self.driver.bytes_available()
    }

    /// Discard received bytes that have not been read.
    pub fn flush_input(&mut self) -> Result<(), PortError> {
        self.driver.flush_input()
    }

    /// One read attempt; see [`SerialDriver::read_data`].
    pub fn read_data(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        self.driver.read_data(buffer)
    }

    /// One write attempt; see [`SerialDriver::write_data`].
    pub fn write_data(&mut self, data: &[u8]) -> Result<usize, PortError> {
        self.driver.write_data(data)
    }

    /// Read up to and including the next `'\n'`. Blocks until one arrives.
    pub fn read_string(&mut self) -> Result<String, PortError> {
        self.driver.read_string()
    }

    pub fn write_string(&mut self, text: &str) -> Result<usize, PortError> {
        self.driver.write_string(text)
    }
}

impl<D: SerialDriver> fmt::Display for SerialPort<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Serial Port:")?;
        write!(f, "{}", self.settings())
    }
}

impl<D: SerialDriver> io::Read for SerialPort<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_data(buf)?)
    }
}

impl<D: SerialDriver> io::Write for SerialPort<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_data(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockDriver;
    use std::io::{Read, Write};

    fn mock_pair() -> (SerialPort<MockDriver>, SerialPort<MockDriver>) {
        let (a, b) = MockDriver::pair(Settings::new("MOCK0", 115200), Settings::new("MOCK1", 115200));
        (SerialPort::with_driver(a), SerialPort::with_driver(b))
    }

    #[test]
    fn test_default_port_uses_default_settings() {
        let port = SerialPort::new();
        assert_eq!(port.settings(), &Settings::default());
        assert!(!port.is_open());
    }

    #[test]
    fn test_from_parts() {
        let port = SerialPort::from_parts("COM2", 115200, Parity::None, StopBits::Two, false, 0, 10);
        let expected = Settings::from_parts("COM2", 115200, Parity::None, StopBits::Two, false, 0, 10);
        assert_eq!(port.settings(), &expected);
    }

    #[test]
    fn test_display() {
        let port = SerialPort::with_settings(Settings::new("COM7", 9600));
        let text = port.to_string();
        assert!(text.starts_with("Serial Port:\nName: COM7\n"));
        assert!(text.ends_with("Timeout [ms]: 0"));
    }

    #[test]
    fn test_never_opened_close_is_noop() {
        let mut port = SerialPort::with_settings(Settings::new("/definitely/not/a/port", 9600));
        port.close();
        port.close();
        assert!(!port.is_open());
    }

    #[test]
    fn test_reopen_keeps_port_open() {
        let (mut a, _b) = mock_pair();
        a.open().unwrap();
        a.open().unwrap();
        assert!(a.is_open());
        a.close();
        a.close();
        assert!(!a.is_open());
    }

    #[test]
    fn test_io_traits_forward() {
        let (mut a, mut b) = mock_pair();
        a.open().unwrap();
        b.open().unwrap();

        a.write_all(b"via std::io").unwrap();
        let mut buffer = [0u8; 11];
        b.read_exact(&mut buffer).unwrap();
        assert_eq!(&buffer, b"via std::io");
    }

    #[test]
    fn test_io_read_on_closed_port() {
        let (mut a, _b) = mock_pair();
        let err = a.read(&mut [0u8; 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
