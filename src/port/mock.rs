//! In-memory serial driver for testing.
//!
//! Provides a `MockDriver` that behaves like a real driver without requiring
//! hardware. Two mocks can be joined into a loopback pair with
//! [`MockDriver::pair`], so bytes written on one end are received on the other.

use super::error::PortError;
use super::settings::Settings;
use super::traits::SerialDriver;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

/// Baud rates the mock accepts; the intersection of the POSIX and Windows tables.
pub const MOCK_BAUD_RATES: &[u32] = &[
    110, 300, 600, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200,
];

/// State of one end of the mock wire.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes received but not yet read.
    read_queue: VecDeque<u8>,
    /// Every successful write, in order.
    write_log: Vec<Vec<u8>>,
    /// Largest number of bytes moved by a single read or write.
    max_transfer: Option<usize>,
}

type Shared = Arc<Mutex<MockPortState>>;

fn lock(state: &Shared) -> MutexGuard<'_, MockPortState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock serial driver.
///
/// This implementation allows you to:
/// - Enqueue data to be returned by read operations
/// - Inspect what data was written
/// - Connect two drivers as a loopback pair
/// - Simulate short transfers
///
/// # Example
/// ```
/// use serial_port::port::{MockDriver, SerialDriver, Settings};
///
/// let (mut a, mut b) = MockDriver::pair(
///     Settings::new("MOCK0", 115200),
///     Settings::new("MOCK1", 115200),
/// );
/// a.open()?;
/// b.open()?;
///
/// a.write_string("hello\n")?;
/// assert_eq!(b.bytes_available()?, 6);
/// assert_eq!(b.read_string()?, "hello\n");
/// # Ok::<(), serial_port::port::PortError>(())
/// ```
#[derive(Debug)]
pub struct MockDriver {
    settings: Settings,
    open: bool,
    local: Shared,
    peer: Option<Shared>,
}

impl MockDriver {
    /// Create a standalone mock. Written bytes are only logged.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            open: false,
            local: Shared::default(),
            peer: None,
        }
    }

    /// Create two mocks wired to each other.
    pub fn pair(a: Settings, b: Settings) -> (Self, Self) {
        let mut first = Self::new(a);
        let mut second = Self::new(b);
        first.peer = Some(Arc::clone(&second.local));
        second.peer = Some(Arc::clone(&first.local));
        (first, second)
    }

    /// Simulate incoming bytes on this end.
    pub fn enqueue_read(&self, data: &[u8]) {
        lock(&self.local).read_queue.extend(data);
    }

    /// Copy of every successful write made on this end.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        lock(&self.local).write_log.clone()
    }

    /// Limit how many bytes a single read or write moves. `None` removes the limit.
    pub fn set_max_transfer(&self, max: Option<usize>) {
        lock(&self.local).max_transfer = max;
    }

    fn transfer_len(&self, requested: usize) -> usize {
        match lock(&self.local).max_transfer {
            Some(max) => requested.min(max),
            None => requested,
        }
    }
}

impl SerialDriver for MockDriver {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn open(&mut self) -> Result<(), PortError> {
        self.close();
        if !MOCK_BAUD_RATES.contains(&self.settings.baud_rate) {
            return Err(PortError::UnsupportedBaudRate(self.settings.baud_rate));
        }
        if self.settings.port_name.is_empty() {
            return Err(PortError::open(
                "",
                io::Error::new(io::ErrorKind::NotFound, "empty port name"),
            ));
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        if !self.open {
            return Ok(0);
        }
        Ok(lock(&self.local).read_queue.len())
    }

    fn flush_input(&mut self) -> Result<(), PortError> {
        if !self.open {
            return Err(PortError::NotOpen);
        }
        lock(&self.local).read_queue.clear();
        Ok(())
    }

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        if !self.open {
            return Err(PortError::NotOpen);
        }
        let len = self.transfer_len(buffer.len());
        let mut state = lock(&self.local);
        let n = len.min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<usize, PortError> {
        if !self.open {
            return Ok(0);
        }
        let n = self.transfer_len(data.len());
        let sent = &data[..n];
        lock(&self.local).write_log.push(sent.to_vec());
        if let Some(peer) = &self.peer {
            lock(peer).read_queue.extend(sent);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_pair() -> (MockDriver, MockDriver) {
        let (mut a, mut b) = MockDriver::pair(Settings::new("MOCK0", 9600), Settings::new("MOCK1", 9600));
        a.open().unwrap();
        b.open().unwrap();
        (a, b)
    }

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockDriver::new(Settings::new("MOCK0", 9600));
        port.open().unwrap();
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read_data(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_empty_read_returns_zero() {
        let mut port = MockDriver::new(Settings::new("MOCK0", 9600));
        port.open().unwrap();
        assert_eq!(port.read_data(&mut [0u8; 8]).unwrap(), 0);
    }

    #[test]
    fn test_write_logging() {
        let mut port = MockDriver::new(Settings::new("MOCK0", 9600));
        port.open().unwrap();
        port.write_data(b"Test1").unwrap();
        port.write_data(b"Test2").unwrap();

        let log = port.write_log();
        assert_eq!(log, vec![b"Test1".to_vec(), b"Test2".to_vec()]);
    }

    #[test]
    fn test_pair_carries_bytes_both_ways() {
        let (mut a, mut b) = open_pair();
        a.write_data(b"ping").unwrap();
        b.write_data(b"pong").unwrap();

        let mut buffer = [0u8; 4];
        assert_eq!(b.read_data(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"ping");
        assert_eq!(a.read_data(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"pong");
    }

    #[test]
    fn test_short_transfers() {
        let (mut a, mut b) = open_pair();
        a.set_max_transfer(Some(3));
        assert_eq!(a.write_data(b"abcdef").unwrap(), 3);
        assert_eq!(b.bytes_available().unwrap(), 3);

        b.set_max_transfer(Some(2));
        let mut buffer = [0u8; 8];
        assert_eq!(b.read_data(&mut buffer).unwrap(), 2);
        assert_eq!(&buffer[..2], b"ab");
    }

    #[test]
    fn test_flush_input() {
        let (mut a, mut b) = open_pair();
        a.write_data(b"Should be cleared").unwrap();
        b.flush_input().unwrap();
        assert_eq!(b.bytes_available().unwrap(), 0);
    }

    #[test]
    fn test_unsupported_baud() {
        let mut port = MockDriver::new(Settings::new("MOCK0", 12345));
        assert!(matches!(port.open(), Err(PortError::UnsupportedBaudRate(12345))));
        assert!(!port.is_open());
    }

    #[test]
    fn test_closed_port() {
        let mut port = MockDriver::new(Settings::new("MOCK0", 9600));
        assert_eq!(port.write_data(b"dropped").unwrap(), 0);
        assert!(port.write_log().is_empty());
        assert!(matches!(port.read_data(&mut [0u8; 1]), Err(PortError::NotOpen)));
        assert!(matches!(port.flush_input(), Err(PortError::NotOpen)));
        assert_eq!(port.bytes_available().unwrap(), 0);
    }
}
