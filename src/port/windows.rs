//! Windows serial driver built on a file handle and the DCB/COMMTIMEOUTS structures.

use super::error::PortError;
use super::settings::{Parity, Settings, StopBits};
use super::traits::SerialDriver;
use std::ffi::OsStr;
use std::io;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::time::Duration;
use tracing::{debug, trace, warn};
use winapi::shared::minwindef::{DWORD, FALSE, TRUE};
use winapi::um::commapi::{ClearCommError, GetCommState, PurgeComm, SetCommState, SetCommTimeouts, SetupComm};
use winapi::um::fileapi::{CreateFileW, FlushFileBuffers, ReadFile, WriteFile, OPEN_EXISTING};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::winbase::{
    COMMTIMEOUTS, COMSTAT, DCB, DTR_CONTROL_ENABLE, EVENPARITY, NOPARITY, ODDPARITY, ONESTOPBIT,
    PURGE_RXCLEAR, RTS_CONTROL_DISABLE, RTS_CONTROL_HANDSHAKE, TWOSTOPBITS,
};
use winapi::um::winnt::{GENERIC_READ, GENERIC_WRITE, HANDLE, MAXDWORD};

/// Depth requested for the driver's input and output queues.
const QUEUE_SIZE: DWORD = 32768;

/// Map an integer baud rate to the `CBR_*` constant.
///
/// Returns `None` for rates outside the fixed table.
pub fn baud_to_cbr(baud_rate: u32) -> Option<DWORD> {
    use winapi::um::winbase::*;

    let cbr = match baud_rate {
        110 => CBR_110,
        300 => CBR_300,
        600 => CBR_600,
        1200 => CBR_1200,
        2400 => CBR_2400,
        4800 => CBR_4800,
        9600 => CBR_9600,
        14400 => CBR_14400,
        19200 => CBR_19200,
        38400 => CBR_38400,
        56000 => CBR_56000,
        57600 => CBR_57600,
        115200 => CBR_115200,
        128000 => CBR_128000,
        256000 => CBR_256000,
        _ => return None,
    };
    Some(cbr)
}

/// Read/write timing for a configured timeout.
///
/// Zero returns immediately with whatever is buffered on read and uses small
/// fixed write constants. Anything else bounds both reads and writes by the
/// timeout.
pub fn comm_timeouts(timeout: Duration) -> COMMTIMEOUTS {
    if timeout.is_zero() {
        return COMMTIMEOUTS {
            ReadIntervalTimeout: MAXDWORD,
            ReadTotalTimeoutMultiplier: 0,
            ReadTotalTimeoutConstant: 0,
            WriteTotalTimeoutMultiplier: 10,
            WriteTotalTimeoutConstant: 50,
        };
    }
    let millis = timeout.as_millis().min(u128::from(MAXDWORD - 1)) as DWORD;
    COMMTIMEOUTS {
        ReadIntervalTimeout: 0,
        ReadTotalTimeoutMultiplier: 0,
        ReadTotalTimeoutConstant: millis,
        WriteTotalTimeoutMultiplier: 0,
        WriteTotalTimeoutConstant: millis,
    }
}

/// Device path for a port name. `COM10` and above only open through `\\.\`.
fn device_path(port_name: &str) -> Vec<u16> {
    let path = if port_name.starts_with(r"\\.\") {
        port_name.to_string()
    } else {
        format!(r"\\.\{}", port_name)
    };
    OsStr::new(&path).encode_wide().chain(Some(0)).collect()
}

/// Owned Win32 handle, closed on drop.
#[derive(Debug)]
struct OwnedHandle(HANDLE);

// The handle is owned exclusively by one driver.
unsafe impl Send for OwnedHandle {}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

fn check(ret: i32) -> io::Result<()> {
    if ret == 0 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Serial driver for Windows.
#[derive(Debug)]
pub struct WindowsDriver {
    settings: Settings,
    handle: Option<OwnedHandle>,
}

impl WindowsDriver {
    /// Create an unopened driver for the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            handle: None,
        }
    }

    fn raw_handle(&self) -> Option<HANDLE> {
        self.handle.as_ref().map(|h| h.0)
    }
}

impl SerialDriver for WindowsDriver {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn open(&mut self) -> Result<(), PortError> {
        self.close();

        let name = &self.settings.port_name;
        let baud = baud_to_cbr(self.settings.baud_rate)
            .ok_or(PortError::UnsupportedBaudRate(self.settings.baud_rate))?;

        let path = device_path(name);
        let raw = unsafe {
            CreateFileW(
                path.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null_mut(),
                OPEN_EXISTING,
                0,
                ptr::null_mut(),
            )
        };
        if raw == INVALID_HANDLE_VALUE {
            return Err(PortError::open(name, io::Error::last_os_error()));
        }
        // From here on the handle is closed on every early return.
        let handle = OwnedHandle(raw);

        configure_line(handle.0, &self.settings, baud).map_err(|e| {
            warn!("Failed to apply port settings on {}: {}", name, e);
            PortError::configure(name, e)
        })?;

        let mut timeouts = comm_timeouts(self.settings.timeout());
        check(unsafe { SetCommTimeouts(handle.0, &mut timeouts) }).map_err(|e| {
            warn!("Failed to apply timeouts on {}: {}", name, e);
            PortError::timeouts(name, e)
        })?;

        debug!(
            "Opened {} at {} baud (parity {}, {} stop bit(s), flow control {})",
            name,
            self.settings.baud_rate,
            self.settings.parity,
            self.settings.stop_bits,
            self.settings.hardware_flow_control
        );
        self.handle = Some(handle);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            drop(handle);
            debug!("Closed {}", self.settings.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        let Some(handle) = self.raw_handle() else {
            return Ok(0);
        };
        let mut errors: DWORD = 0;
        let mut stat: COMSTAT = unsafe { mem::zeroed() };
        check(unsafe { ClearCommError(handle, &mut errors, &mut stat) })?;
        Ok(stat.cbInQue as usize)
    }

    fn flush_input(&mut self) -> Result<(), PortError> {
        let handle = self.raw_handle().ok_or(PortError::NotOpen)?;
        check(unsafe { PurgeComm(handle, PURGE_RXCLEAR) })
            .map_err(|e| PortError::flush(&self.settings.port_name, e))
    }

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let handle = self.raw_handle().ok_or(PortError::NotOpen)?;
        let len = buffer.len().min(DWORD::MAX as usize) as DWORD;
        let mut read: DWORD = 0;
        check(unsafe { ReadFile(handle, buffer.as_mut_ptr().cast(), len, &mut read, ptr::null_mut()) })?;
        trace!("Read {} of {} bytes from {}", read, buffer.len(), self.settings.port_name);
        Ok(read as usize)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let Some(handle) = self.raw_handle() else {
            return Ok(0);
        };
        let len = data.len().min(DWORD::MAX as usize) as DWORD;
        let mut written: DWORD = 0;
        check(unsafe { WriteFile(handle, data.as_ptr().cast(), len, &mut written, ptr::null_mut()) })?;
        trace!("Wrote {} of {} bytes to {}", written, data.len(), self.settings.port_name);
        let flushed = check(unsafe { FlushFileBuffers(handle) });
        Ok(written_after_flush(&self.settings.port_name, written, flushed))
    }
}

impl Drop for WindowsDriver {
    fn drop(&mut self) {
        self.close();
    }
}

/// Bytes already handed to the device are reported even when the flush fails.
fn written_after_flush(port_name: &str, written: DWORD, flushed: io::Result<()>) -> usize {
    if let Err(e) = flushed {
        warn!("Failed to flush {} after writing {} bytes: {}", port_name, written, e);
    }
    written as usize
}

/// Size the queues, then read the DCB, adjust it and write it back.
fn configure_line(handle: HANDLE, settings: &Settings, baud: DWORD) -> io::Result<()> {
    check(unsafe { SetupComm(handle, QUEUE_SIZE, QUEUE_SIZE) })?;

    let mut dcb: DCB = unsafe { mem::zeroed() };
    dcb.DCBlength = mem::size_of::<DCB>() as DWORD;
    check(unsafe { GetCommState(handle, &mut dcb) })?;

    dcb.set_fBinary(TRUE as DWORD);
    dcb.set_fInX(FALSE as DWORD);
    dcb.set_fOutX(FALSE as DWORD);
    dcb.set_fAbortOnError(FALSE as DWORD);
    dcb.set_fNull(FALSE as DWORD);
    dcb.set_fDsrSensitivity(FALSE as DWORD);
    dcb.set_fOutxDsrFlow(FALSE as DWORD);
    dcb.set_fDtrControl(DTR_CONTROL_ENABLE);

    dcb.BaudRate = baud;
    dcb.ByteSize = 8;

    dcb.StopBits = match settings.stop_bits {
        StopBits::One => ONESTOPBIT,
        StopBits::Two => TWOSTOPBITS,
    };

    let (parity, enabled) = match settings.parity {
        Parity::None => (NOPARITY, FALSE),
        Parity::Odd => (ODDPARITY, TRUE),
        Parity::Even => (EVENPARITY, TRUE),
    };
    dcb.Parity = parity;
    dcb.set_fParity(enabled as DWORD);

    if settings.hardware_flow_control {
        dcb.set_fOutxCtsFlow(TRUE as DWORD);
        dcb.set_fRtsControl(RTS_CONTROL_HANDSHAKE);
    } else {
        dcb.set_fOutxCtsFlow(FALSE as DWORD);
        dcb.set_fRtsControl(RTS_CONTROL_DISABLE);
    }

    check(unsafe { SetCommState(handle, &mut dcb) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_table() {
        assert_eq!(baud_to_cbr(9600), Some(winapi::um::winbase::CBR_9600));
        assert_eq!(baud_to_cbr(256000), Some(winapi::um::winbase::CBR_256000));
        assert_eq!(baud_to_cbr(12345), None);
        assert_eq!(baud_to_cbr(230400), None);
    }

    #[test]
    fn test_zero_timeout_returns_immediately() {
        let t = comm_timeouts(Duration::ZERO);
        assert_eq!(t.ReadIntervalTimeout, MAXDWORD);
        assert_eq!(t.ReadTotalTimeoutConstant, 0);
        assert_eq!(t.WriteTotalTimeoutMultiplier, 10);
        assert_eq!(t.WriteTotalTimeoutConstant, 50);
    }

    #[test]
    fn test_configured_timeout_bounds_reads_and_writes() {
        let t = comm_timeouts(Duration::from_millis(1500));
        assert_eq!(t.ReadIntervalTimeout, 0);
        assert_eq!(t.ReadTotalTimeoutConstant, 1500);
        assert_eq!(t.WriteTotalTimeoutConstant, 1500);
    }

    #[test]
    fn test_device_path_prefix() {
        let expected: Vec<u16> = OsStr::new(r"\\.\COM12").encode_wide().chain(Some(0)).collect();
        assert_eq!(device_path("COM12"), expected);
        assert_eq!(device_path(r"\\.\COM12"), expected);
    }

    #[test]
    fn test_failed_flush_keeps_write_count() {
        let flushed = Err(io::Error::from_raw_os_error(6));
        assert_eq!(written_after_flush("COM3", 19, flushed), 19);
        assert_eq!(written_after_flush("COM3", 5, Ok(())), 5);
    }

    #[test]
    fn test_open_missing_device() {
        let mut driver = WindowsDriver::new(Settings::new("COM255", 9600));
        assert!(matches!(driver.open(), Err(PortError::Open { .. })));
        assert!(!driver.is_open());
        driver.close();
        driver.close();
    }
}
