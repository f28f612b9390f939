//! Port discovery through the `HARDWARE\DEVICEMAP\SERIALCOMM` registry key.

use crate::port::{sort_ports, PortInfo};
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use tracing::{debug, trace};
use winapi::shared::minwindef::{DWORD, HKEY};
use winapi::shared::winerror::{ERROR_NO_MORE_ITEMS, ERROR_SUCCESS};
use winapi::um::winnt::{KEY_QUERY_VALUE, REG_SZ};
use winapi::um::winreg::{RegCloseKey, RegEnumValueW, RegOpenKeyExW, RegQueryInfoKeyW, HKEY_LOCAL_MACHINE};

const SERIAL_COMM_KEY: &str = r"HARDWARE\DEVICEMAP\SERIALCOMM";

/// Open registry key, closed on drop.
struct RegistryKey(HKEY);

impl RegistryKey {
    fn open_local_machine(path: &str) -> Result<Self, DWORD> {
        let wide: Vec<u16> = OsStr::new(path).encode_wide().chain(Some(0)).collect();
        let mut key: HKEY = ptr::null_mut();
        let status = unsafe { RegOpenKeyExW(HKEY_LOCAL_MACHINE, wide.as_ptr(), 0, KEY_QUERY_VALUE, &mut key) };
        if status as DWORD != ERROR_SUCCESS {
            return Err(status as DWORD);
        }
        Ok(Self(key))
    }

    /// Longest value name (in UTF-16 units) and longest value data (in bytes).
    fn max_value_sizes(&self) -> Result<(DWORD, DWORD), DWORD> {
        let mut max_name: DWORD = 0;
        let mut max_data: DWORD = 0;
        let status = unsafe {
            RegQueryInfoKeyW(
                self.0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
                &mut max_name,
                &mut max_data,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        if status as DWORD != ERROR_SUCCESS {
            return Err(status as DWORD);
        }
        Ok((max_name, max_data))
    }
}

impl Drop for RegistryKey {
    fn drop(&mut self) {
        unsafe { RegCloseKey(self.0) };
    }
}

/// Decode a UTF-16 registry string, dropping the terminator and anything after it.
fn from_wide(units: &[u16]) -> String {
    let end = units.iter().position(|&c| c == 0).unwrap_or(units.len());
    String::from_utf16_lossy(&units[..end])
}

pub(super) fn enumerate() -> Vec<PortInfo> {
    let key = match RegistryKey::open_local_machine(SERIAL_COMM_KEY) {
        Ok(key) => key,
        Err(status) => {
            debug!("Cannot open registry key {}: error {}", SERIAL_COMM_KEY, status);
            return Vec::new();
        }
    };
    let (max_name, max_data) = match key.max_value_sizes() {
        Ok(sizes) => sizes,
        Err(status) => {
            debug!("Cannot query registry key {}: error {}", SERIAL_COMM_KEY, status);
            return Vec::new();
        }
    };

    // Room for the terminator on both buffers.
    let mut name = vec![0u16; max_name as usize + 1];
    let mut data = vec![0u16; max_data as usize / 2 + 1];
    let mut ports = Vec::new();

    for index in 0.. {
        let mut name_len = name.len() as DWORD;
        let mut data_len = (data.len() * 2) as DWORD;
        let mut kind: DWORD = 0;
        let status = unsafe {
            RegEnumValueW(
                key.0,
                index,
                name.as_mut_ptr(),
                &mut name_len,
                ptr::null_mut(),
                &mut kind,
                data.as_mut_ptr().cast(),
                &mut data_len,
            )
        } as DWORD;
        if status == ERROR_NO_MORE_ITEMS {
            break;
        }
        if status != ERROR_SUCCESS {
            debug!("Stopped enumerating {} at value {}: error {}", SERIAL_COMM_KEY, index, status);
            break;
        }
        if kind != REG_SZ {
            trace!("Skipping non-string value {}", from_wide(&name[..name_len as usize]));
            continue;
        }

        let long_name = from_wide(&name[..name_len as usize]);
        let short_name = from_wide(&data[..data_len as usize / 2]);
        trace!("{} maps to {}", long_name, short_name);
        ports.push(PortInfo::new(long_name, short_name));
    }

    sort_ports(&mut ports);
    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wide(text: &str) -> Vec<u16> {
        OsStr::new(text).encode_wide().collect()
    }

    #[test]
    fn test_from_wide_stops_at_terminator() {
        let mut units = wide("COM3");
        units.push(0);
        units.extend(wide("garbage"));
        assert_eq!(from_wide(&units), "COM3");
    }

    #[test]
    fn test_from_wide_without_terminator() {
        assert_eq!(from_wide(&wide(r"\Device\Serial0")), r"\Device\Serial0");
    }
}
