//! Port configuration and port description values.
//!
//! [`Settings`] describes how a port should be opened; nothing is validated
//! here. Validity is only assessed when a driver applies the settings to real
//! hardware in `open()`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Name of the port used when none is given.
#[cfg(windows)]
pub const DEFAULT_PORT_NAME: &str = "COM1";

/// Name of the port used when none is given.
#[cfg(not(windows))]
pub const DEFAULT_PORT_NAME: &str = "/dev/ttyS0";

/// Baud rate used when none is given.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Parity checking modes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

impl Parity {
    /// Lower-case word used in summaries and configuration files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Odd => "odd",
            Self::Even => "even",
        }
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Parity {
    type Err = String;

    /// Case-insensitive `none`, `odd` or `even`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "odd" => Ok(Self::Odd),
            "even" => Ok(Self::Even),
            other => Err(format!("unknown parity '{}'", other)),
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl StopBits {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::Two => "two",
        }
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StopBits {
    type Err = String;

    /// `1`/`one` or `2`/`two`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "2" | "two" => Ok(Self::Two),
            other => Err(format!("unknown stop bit count '{}'", other)),
        }
    }
}

/// Configuration parameters for a serial port.
///
/// Character size is always 8 bits. The timeout fields combine into a single
/// read/write timeout (see [`Settings::timeout`]); zero means the driver's
/// platform default timing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// System name of the port (e.g. "/dev/ttyUSB0" or "COM3").
    pub port_name: String,

    /// Baud rate (bits per second). Checked against the platform table on open.
    pub baud_rate: u32,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// RTS/CTS hardware flow control.
    pub hardware_flow_control: bool,

    /// Timeout, whole seconds part.
    pub timeout_s: u64,

    /// Timeout, milliseconds part.
    pub timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port_name: DEFAULT_PORT_NAME.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            parity: Parity::None,
            stop_bits: StopBits::One,
            hardware_flow_control: false,
            timeout_s: 0,
            timeout_ms: 0,
        }
    }
}

impl Settings {
    /// Settings for `port_name` at `baud_rate`, 8-N-1 without flow control.
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Settings from every field at once.
    pub fn from_parts(
        port_name: impl Into<String>,
        baud_rate: u32,
        parity: Parity,
        stop_bits: StopBits,
        hardware_flow_control: bool,
        timeout_s: u64,
        timeout_ms: u64,
    ) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            parity,
            stop_bits,
            hardware_flow_control,
            timeout_s,
            timeout_ms,
        }
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_hardware_flow_control(mut self, enabled: bool) -> Self {
        self.hardware_flow_control = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout_s: u64, timeout_ms: u64) -> Self {
        self.timeout_s = timeout_s;
        self.timeout_ms = timeout_ms;
        self
    }

    /// Combined read/write timeout. `Duration::ZERO` when none is configured.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_s).saturating_add(Duration::from_millis(self.timeout_ms))
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}", self.port_name)?;
        writeln!(f, "Baud rate: {}", self.baud_rate)?;
        writeln!(f, "Parity: {}", self.parity)?;
        writeln!(f, "Number of stop bits: {}", self.stop_bits)?;
        writeln!(f, "Hardware flow control: {}", self.hardware_flow_control)?;
        writeln!(f, "Timeout [s]: {}", self.timeout_s)?;
        write!(f, "Timeout [ms]: {}", self.timeout_ms)
    }
}

/// A port found by enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortInfo {
    /// Human readable / registry name. Same as `short_name` where the platform
    /// has no separate friendly name.
    pub long_name: String,

    /// Addressable device name (e.g. "/dev/ttyS0" or "COM1").
    pub short_name: String,
}

impl PortInfo {
    pub fn new(long_name: impl Into<String>, short_name: impl Into<String>) -> Self {
        Self {
            long_name: long_name.into(),
            short_name: short_name.into(),
        }
    }

    /// Ordering used for enumeration output: lexicographic on `short_name`.
    pub fn cmp_by_short_name(&self, other: &Self) -> Ordering {
        self.short_name.cmp(&other.short_name)
    }
}

impl fmt::Display for PortInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Port info - Long name: {}\tShort name: {}",
            self.long_name, self.short_name
        )
    }
}

/// Sort ports by `short_name`. Stable, so duplicates keep their discovery order.
pub fn sort_ports(ports: &mut [PortInfo]) {
    ports.sort_by(PortInfo::cmp_by_short_name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.port_name, DEFAULT_PORT_NAME);
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert!(!settings.hardware_flow_control);
        assert_eq!(settings.timeout_s, 0);
        assert_eq!(settings.timeout_ms, 0);
        assert_eq!(settings.timeout(), Duration::ZERO);
    }

    #[test]
    fn test_from_parts_matches_builder() {
        let parts = Settings::from_parts("COM2", 115200, Parity::Even, StopBits::Two, true, 1, 10);
        let built = Settings::new("COM2", 115200)
            .with_parity(Parity::Even)
            .with_stop_bits(StopBits::Two)
            .with_hardware_flow_control(true)
            .with_timeout(1, 10);
        assert_eq!(parts, built);
        assert_eq!(parts.timeout(), Duration::from_millis(1010));
    }

    #[test]
    fn test_settings_summary() {
        let settings = Settings::from_parts("COM2", 115200, Parity::Odd, StopBits::Two, false, 0, 10);
        let expected = "Name: COM2\n\
                        Baud rate: 115200\n\
                        Parity: odd\n\
                        Number of stop bits: two\n\
                        Hardware flow control: false\n\
                        Timeout [s]: 0\n\
                        Timeout [ms]: 10";
        assert_eq!(settings.to_string(), expected);
    }

    #[test]
    fn test_settings_toml_uses_lowercase_words() {
        let settings = Settings::new("/dev/ttyUSB0", 57600).with_parity(Parity::Even);
        let text = toml::to_string(&settings).unwrap();
        assert!(text.contains("parity = \"even\""));
        assert!(text.contains("stop_bits = \"one\""));

        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let settings: Settings = toml::from_str("baud_rate = 19200").unwrap();
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.port_name, DEFAULT_PORT_NAME);
    }

    #[test]
    fn test_parse_line_words() {
        assert_eq!("Even".parse::<Parity>(), Ok(Parity::Even));
        assert_eq!(" none ".parse::<Parity>(), Ok(Parity::None));
        assert!("mark".parse::<Parity>().is_err());
        assert_eq!("2".parse::<StopBits>(), Ok(StopBits::Two));
        assert_eq!("ONE".parse::<StopBits>(), Ok(StopBits::One));
        assert!("1.5".parse::<StopBits>().is_err());
    }

    #[test]
    fn test_port_info_display() {
        let info = PortInfo::new("\\Device\\Serial0", "COM1");
        assert_eq!(
            info.to_string(),
            "Port info - Long name: \\Device\\Serial0\tShort name: COM1"
        );
    }

    #[test]
    fn test_sort_ports_is_stable() {
        let mut ports = vec![
            PortInfo::new("b", "/dev/ttyUSB1"),
            PortInfo::new("first", "/dev/ttyS0"),
            PortInfo::new("a", "/dev/ttyACM0"),
            PortInfo::new("second", "/dev/ttyS0"),
        ];
        sort_ports(&mut ports);
        let names: Vec<_> = ports.iter().map(|p| p.long_name.as_str()).collect();
        assert_eq!(names, ["a", "first", "second", "b"]);
    }
}
