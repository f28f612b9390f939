//! Port discovery through the `/sys/class/tty` hierarchy.

use crate::port::{sort_ports, PortInfo};
use std::fs::{self, OpenOptions};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const SYS_TTY_DIR: &str = "/sys/class/tty";
const DEV_DIR: &str = "/dev";

/// The generic 8250/16550 driver registers phantom ports that have to be probed.
const LEGACY_UART_DRIVER: &str = "serial8250";

/// `PORT_UNKNOWN` from `linux/serial.h`.
const PORT_UNKNOWN: libc::c_int = 0;

/// `struct serial_struct` from `linux/serial.h`.
#[repr(C)]
#[allow(dead_code)] // Only `kind` is read; the rest is layout.
struct SerialStruct {
    kind: libc::c_int,
    line: libc::c_int,
    port: libc::c_uint,
    irq: libc::c_int,
    flags: libc::c_int,
    xmit_fifo_size: libc::c_int,
    custom_divisor: libc::c_int,
    baud_base: libc::c_int,
    close_delay: libc::c_ushort,
    io_type: libc::c_char,
    reserved_char: [libc::c_char; 1],
    hub6: libc::c_int,
    closing_wait: libc::c_ushort,
    closing_wait2: libc::c_ushort,
    iomem_base: *mut libc::c_uchar,
    iomem_reg_shift: libc::c_ushort,
    port_high: libc::c_uint,
    iomap_base: libc::c_ulong,
}

pub(super) fn enumerate() -> Vec<PortInfo> {
    scan(Path::new(SYS_TTY_DIR), Path::new(DEV_DIR), probe_legacy_uart)
}

/// Classify every tty under `sys_dir` and return the usable device nodes under `dev_dir`.
///
/// Devices bound to [`LEGACY_UART_DRIVER`] are only kept if `probe` accepts them.
fn scan(sys_dir: &Path, dev_dir: &Path, mut probe: impl FnMut(&Path) -> bool) -> Vec<PortInfo> {
    let entries = match fs::read_dir(sys_dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Cannot list {}: {}", sys_dir.display(), e);
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    let mut legacy = Vec::new();
    for entry in entries.flatten() {
        let Some(driver) = driver_name(&entry.path()) else {
            continue;
        };
        let device = dev_dir.join(entry.file_name());
        if driver == LEGACY_UART_DRIVER {
            legacy.push(device);
        } else {
            trace!("{} is bound to {}", device.display(), driver);
            found.push(device);
        }
    }

    for device in legacy {
        if probe(&device) {
            found.push(device);
        } else {
            trace!("Skipping unconfigured {} port {}", LEGACY_UART_DRIVER, device.display());
        }
    }

    let mut ports: Vec<PortInfo> = found.iter().map(PathBuf::as_path).map(port_info).collect();
    sort_ports(&mut ports);
    ports
}

fn port_info(path: &Path) -> PortInfo {
    let name = path.to_string_lossy().into_owned();
    PortInfo::new(name.clone(), name)
}

/// Name of the kernel driver owning a tty, from its `device/driver` symlink.
fn driver_name(tty_dir: &Path) -> Option<String> {
    let device = tty_dir.join("device");
    let metadata = fs::symlink_metadata(&device).ok()?;
    if !metadata.file_type().is_symlink() {
        return None;
    }
    let target = fs::read_link(device.join("driver")).ok()?;
    target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Whether a legacy UART port has real hardware behind it.
fn probe_legacy_uart(device: &Path) -> bool {
    let file = match OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_NONBLOCK | libc::O_NOCTTY)
        .open(device)
    {
        Ok(file) => file,
        Err(e) => {
            trace!("Cannot probe {}: {}", device.display(), e);
            return false;
        }
    };

    let mut info: SerialStruct = unsafe { std::mem::zeroed() };
    let ret = unsafe { libc::ioctl(file.as_raw_fd(), libc::TIOCGSERIAL, &mut info as *mut SerialStruct) };
    ret == 0 && info.kind != PORT_UNKNOWN
}
