//! Tests requiring a real pair of connected serial ports.
//!
//! These tests are ignored by default.
//!
//! # Running Hardware Tests
//!
//! ```bash
//! # Two ports joined by a null-modem cable, or set port_a / port_b
//! # under [testing] in serial-port.toml
//! export SERIAL_PORT_TESTING_PORT_A=/dev/ttyUSB0   # or COM3 on Windows
//! export SERIAL_PORT_TESTING_PORT_B=/dev/ttyUSB1   # or COM4 on Windows
//! export SERIAL_PORT_TESTING_BAUD=115200           # optional, default: 115200
//!
//! cargo test --test hardware_loopback -- --ignored
//! ```

mod common;

use common::{hardware_pair, HardwarePair, TEST_MESSAGE};
use pretty_assertions::assert_eq;
use serial_port::{Parity, SerialPort, Settings, StopBits};
use std::thread;
use std::time::Duration;

/// Time for a short message to cross the cable at the slowest tested rate.
const SETTLE: Duration = Duration::from_millis(100);

fn open_pair(pair: &HardwarePair, baud: u32) -> (SerialPort, SerialPort) {
    let settings = |name: &str| {
        Settings::from_parts(name, baud, Parity::None, StopBits::One, false, 1, 0)
    };
    let mut port_a = SerialPort::with_settings(settings(&pair.port_a));
    let mut port_b = SerialPort::with_settings(settings(&pair.port_b));
    port_a.open().expect("open port A");
    port_b.open().expect("open port B");
    port_a.flush_input().expect("flush port A");
    port_b.flush_input().expect("flush port B");
    (port_a, port_b)
}

#[test]
#[ignore] // Run with --ignored flag
fn test_hardware_raw_round_trip() {
    let Some(pair) = hardware_pair() else {
        return;
    };
    let (mut port_a, mut port_b) = open_pair(&pair, pair.baud);

    let message = b"I am a test!\r\n.....";
    assert_eq!(port_a.write_data(message).unwrap(), message.len());
    thread::sleep(SETTLE);

    assert_eq!(port_b.bytes_available().unwrap(), message.len());
    let mut buffer = [0u8; 100];
    let n = port_b.read_data(&mut buffer).unwrap();
    assert_eq!(&buffer[..n], message);
}

#[test]
#[ignore]
fn test_hardware_string_round_trip() {
    let Some(pair) = hardware_pair() else {
        return;
    };
    let (mut port_a, mut port_b) = open_pair(&pair, pair.baud);

    port_b.write_string(TEST_MESSAGE).unwrap();
    assert_eq!(port_a.read_string().unwrap(), TEST_MESSAGE);
}

#[test]
#[ignore]
fn test_hardware_flush_discards_received_bytes() {
    let Some(pair) = hardware_pair() else {
        return;
    };
    let (mut port_a, mut port_b) = open_pair(&pair, pair.baud);

    port_a.write_string(TEST_MESSAGE).unwrap();
    thread::sleep(SETTLE);
    assert!(port_b.bytes_available().unwrap() > 0);

    port_b.flush_input().unwrap();
    assert_eq!(port_b.bytes_available().unwrap(), 0);
}

#[test]
#[ignore]
fn test_hardware_common_baud_rates() {
    let Some(pair) = hardware_pair() else {
        return;
    };

    for baud in [9600, 19200, 38400, 57600, 115200] {
        let (mut port_a, mut port_b) = open_pair(&pair, baud);
        port_a.write_string(TEST_MESSAGE).unwrap();
        assert_eq!(port_b.read_string().unwrap(), TEST_MESSAGE, "at {} baud", baud);
    }
}
