//! POSIX serial driver built on a file descriptor and termios.

use super::error::PortError;
use super::settings::{Parity, Settings, StopBits};
use super::traits::SerialDriver;
use std::ffi::CString;
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Map an integer baud rate to the termios speed token.
///
/// Returns `None` for rates outside the fixed table.
pub fn baud_to_speed(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        0 => libc::B0,
        50 => libc::B50,
        75 => libc::B75,
        110 => libc::B110,
        134 => libc::B134,
        150 => libc::B150,
        200 => libc::B200,
        300 => libc::B300,
        600 => libc::B600,
        1200 => libc::B1200,
        1800 => libc::B1800,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        460800 => libc::B460800,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        500000 => libc::B500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        576000 => libc::B576000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        921600 => libc::B921600,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1000000 => libc::B1000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1152000 => libc::B1152000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        1500000 => libc::B1500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        2000000 => libc::B2000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        2500000 => libc::B2500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        3000000 => libc::B3000000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        3500000 => libc::B3500000,
        #[cfg(any(target_os = "linux", target_os = "android"))]
        4000000 => libc::B4000000,
        _ => return None,
    };
    Some(speed)
}

/// `(VMIN, VTIME)` for a read timeout.
///
/// Zero blocks until at least one byte arrives. Anything else is rounded up to
/// deciseconds and capped at 25.5 s, and a read returns 0 bytes on expiry.
pub fn read_timing(timeout: Duration) -> (libc::cc_t, libc::cc_t) {
    if timeout.is_zero() {
        return (1, 0);
    }
    let deciseconds = timeout.as_millis().div_ceil(100).clamp(1, 255);
    (0, deciseconds as libc::cc_t)
}

/// Serial driver for POSIX systems.
#[derive(Debug)]
pub struct PosixDriver {
    settings: Settings,
    fd: Option<OwnedFd>,
}

impl PosixDriver {
    /// Create an unopened driver for the given settings.
    pub fn new(settings: Settings) -> Self {
        Self { settings, fd: None }
    }

    fn raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(AsRawFd::as_raw_fd)
    }
}

impl SerialDriver for PosixDriver {
    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn open(&mut self) -> Result<(), PortError> {
        self.close();

        let name = &self.settings.port_name;
        let speed = baud_to_speed(self.settings.baud_rate)
            .ok_or(PortError::UnsupportedBaudRate(self.settings.baud_rate))?;

        let path = CString::new(name.as_bytes())
            .map_err(|e| PortError::open(name, io::Error::new(io::ErrorKind::InvalidInput, e)))?;
        let raw = unsafe { libc::open(path.as_ptr(), libc::O_RDWR | libc::O_NOCTTY | libc::O_CLOEXEC) };
        if raw < 0 {
            return Err(PortError::open(name, io::Error::last_os_error()));
        }
        // From here on the descriptor is closed on every early return.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        get_attributes(fd.as_raw_fd())
            .and_then(|current| raw_attributes(current, &self.settings, speed))
            .and_then(|tty| set_attributes(fd.as_raw_fd(), &tty))
            .map_err(|e| {
                warn!("Failed to apply port settings on {}: {}", name, e);
                PortError::configure(name, e)
            })?;

        debug!(
            "Opened {} at {} baud (parity {}, {} stop bit(s), flow control {})",
            name,
            self.settings.baud_rate,
            self.settings.parity,
            self.settings.stop_bits,
            self.settings.hardware_flow_control
        );
        self.fd = Some(fd);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(fd) = self.fd.take() {
            drop(fd);
            debug!("Closed {}", self.settings.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    fn bytes_available(&mut self) -> Result<usize, PortError> {
        let Some(fd) = self.raw_fd() else {
            return Ok(0);
        };
        let mut count: libc::c_int = 0;
        cvt(unsafe { libc::ioctl(fd, libc::FIONREAD, &mut count as *mut libc::c_int) })?;
        Ok(count.max(0) as usize)
    }

    fn flush_input(&mut self) -> Result<(), PortError> {
        let fd = self.raw_fd().ok_or(PortError::NotOpen)?;
        cvt(unsafe { libc::tcflush(fd, libc::TCIFLUSH) })
            .map_err(|e| PortError::flush(&self.settings.port_name, e))?;
        Ok(())
    }

    fn read_data(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let fd = self.raw_fd().ok_or(PortError::NotOpen)?;
        let n = unsafe { libc::read(fd, buffer.as_mut_ptr().cast(), buffer.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error().into());
        }
        trace!("Read {} of {} bytes from {}", n, buffer.len(), self.settings.port_name);
        Ok(n as usize)
    }

    fn write_data(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let Some(fd) = self.raw_fd() else {
            return Ok(0);
        };
        let n = unsafe { libc::write(fd, data.as_ptr().cast(), data.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error().into());
        }
        trace!("Wrote {} of {} bytes to {}", n, data.len(), self.settings.port_name);
        Ok(n as usize)
    }
}

impl Drop for PosixDriver {
    fn drop(&mut self) {
        self.close();
    }
}

fn cvt(ret: libc::c_int) -> io::Result<libc::c_int> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(ret)
    }
}

fn get_attributes(fd: RawFd) -> io::Result<libc::termios> {
    let mut tty = MaybeUninit::<libc::termios>::uninit();
    cvt(unsafe { libc::tcgetattr(fd, tty.as_mut_ptr()) })?;
    Ok(unsafe { tty.assume_init() })
}

fn set_attributes(fd: RawFd, tty: &libc::termios) -> io::Result<()> {
    cvt(unsafe { libc::tcsetattr(fd, libc::TCSANOW, tty) })?;
    Ok(())
}

/// `tty` switched to raw 8-bit mode with parity, stop bits, flow control,
/// speed and read timing from `settings`. Applied with a single `tcsetattr`.
fn raw_attributes(mut tty: libc::termios, settings: &Settings, speed: libc::speed_t) -> io::Result<libc::termios> {

    // Non-canonical, no echo, no signals, no output processing.
    unsafe { libc::cfmakeraw(&mut tty) };
    tty.c_cflag |= libc::CLOCAL | libc::CREAD;
    tty.c_iflag &= !(libc::IXON | libc::IXOFF | libc::IXANY);

    tty.c_cflag &= !libc::CSIZE;
    tty.c_cflag |= libc::CS8;

    match settings.parity {
        Parity::None => {
            tty.c_cflag &= !(libc::PARENB | libc::PARODD);
            tty.c_iflag &= !libc::INPCK;
        }
        Parity::Odd => {
            tty.c_cflag |= libc::PARENB | libc::PARODD;
            tty.c_iflag |= libc::INPCK;
        }
        Parity::Even => {
            tty.c_cflag |= libc::PARENB;
            tty.c_cflag &= !libc::PARODD;
            tty.c_iflag |= libc::INPCK;
        }
    }

    match settings.stop_bits {
        StopBits::One => tty.c_cflag &= !libc::CSTOPB,
        StopBits::Two => tty.c_cflag |= libc::CSTOPB,
    }

    if settings.hardware_flow_control {
        tty.c_cflag |= libc::CRTSCTS;
    } else {
        tty.c_cflag &= !libc::CRTSCTS;
    }

    cvt(unsafe { libc::cfsetispeed(&mut tty, speed) })?;
    cvt(unsafe { libc::cfsetospeed(&mut tty, speed) })?;

    let (vmin, vtime) = read_timing(settings.timeout());
    tty.c_cc[libc::VMIN] = vmin;
    tty.c_cc[libc::VTIME] = vtime;

    Ok(tty)
}
