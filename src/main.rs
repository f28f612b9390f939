//! Command-line front end for the serial-port library.
//!
//! ```bash
//! serial-port list --json
//! serial-port send /dev/ttyUSB0 "AT" --newline --baud 115200
//! serial-port listen gps --lines 10
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serial_port::config::{Config, ConfigLoader, LogFormat, LoggingConfig};
use serial_port::{Parity, SerialPort, Settings, StopBits};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Bytes per line in `dump` output.
const DUMP_ROW: usize = 16;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "serial-port",
    version,
    about = "Open, configure, read, write and enumerate serial ports."
)]
struct Cli {
    /// Configuration file (overrides the standard search path).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the serial ports present on this machine.
    List {
        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the settings a port would be opened with.
    Show {
        /// Port name or alias. Defaults to the configured port.
        port: Option<String>,
        #[command(flatten)]
        options: PortOptions,
    },
    /// Write a string to a port.
    Send {
        /// Port name or alias.
        port: String,
        /// Text to send.
        text: String,
        /// Append a '\n' to the text.
        #[arg(long)]
        newline: bool,
        #[command(flatten)]
        options: PortOptions,
    },
    /// Print newline-terminated lines received on a port.
    Listen {
        /// Port name or alias.
        port: String,
        /// Stop after this many lines.
        #[arg(long)]
        lines: Option<usize>,
        #[command(flatten)]
        options: PortOptions,
    },
    /// Read raw bytes from a port and print them as hex.
    Dump {
        /// Port name or alias.
        port: String,
        /// Number of bytes to read.
        #[arg(long, default_value_t = 16)]
        count: usize,
        #[command(flatten)]
        options: PortOptions,
    },
}

/// Per-invocation overrides of the configured port settings.
#[derive(Args, Debug, Default)]
struct PortOptions {
    /// Baud rate.
    #[arg(long)]
    baud: Option<u32>,
    /// Parity bit.
    #[arg(long, value_enum)]
    parity: Option<ParityArg>,
    /// Number of stop bits.
    #[arg(long, value_enum)]
    stop_bits: Option<StopBitsArg>,
    /// Enable RTS/CTS hardware flow control.
    #[arg(long)]
    flow_control: bool,
    /// Read/write timeout in milliseconds. 0 blocks.
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ParityArg {
    None,
    Odd,
    Even,
}

impl From<ParityArg> for Parity {
    fn from(arg: ParityArg) -> Self {
        match arg {
            ParityArg::None => Parity::None,
            ParityArg::Odd => Parity::Odd,
            ParityArg::Even => Parity::Even,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StopBitsArg {
    #[value(name = "1")]
    One,
    #[value(name = "2")]
    Two,
}

impl From<StopBitsArg> for StopBits {
    fn from(arg: StopBitsArg) -> Self {
        match arg {
            StopBitsArg::One => StopBits::One,
            StopBitsArg::Two => StopBits::Two,
        }
    }
}

impl PortOptions {
    /// Configured defaults for `port` with the command-line overrides applied.
    fn settings(&self, config: &Config, port: Option<&str>) -> Settings {
        let serial = &config.serial;
        let mut settings = match port {
            Some(port) => serial.settings_for(port),
            None => serial.settings_for(&serial.defaults.port_name),
        };
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(parity) = self.parity {
            settings.parity = parity.into();
        }
        if let Some(stop_bits) = self.stop_bits {
            settings.stop_bits = stop_bits.into();
        }
        if self.flow_control {
            settings.hardware_flow_control = true;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_s = 0;
            settings.timeout_ms = timeout_ms;
        }
        settings
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from(path),
        None => ConfigLoader::load(),
    };
    let config = match loaded {
        Ok(loader) => loader.into_config(),
        Err(e) => {
            eprintln!("Warning: Failed to load config, using defaults: {}", e);
            ConfigLoader::with_defaults().into_config()
        }
    };

    init_logging(&config.logging);
    debug!(command = ?cli.command, "Starting");

    match &cli.command {
        Command::List { json } => list_ports(*json)?,
        Command::Show { port, options } => {
            let port = SerialPort::with_settings(options.settings(&config, port.as_deref()));
            println!("{}", port);
        }
        Command::Send {
            port,
            text,
            newline,
            options,
        } => {
            let mut port = open_port(options.settings(&config, Some(port.as_str())))?;
            let mut text = text.clone();
            if *newline {
                text.push('\n');
            }
            let written = port.write_string(&text)?;
            info!("Wrote {} of {} bytes", written, text.len());
        }
        Command::Listen {
            port,
            lines,
            options,
        } => {
            let mut port = open_port(options.settings(&config, Some(port.as_str())))?;
            let stdout = std::io::stdout();
            let mut received = 0;
            while lines.map_or(true, |limit| received < limit) {
                let line = port.read_string()?;
                let mut out = stdout.lock();
                out.write_all(line.as_bytes())?;
                out.flush()?;
                received += 1;
            }
        }
        Command::Dump {
            port,
            count,
            options,
        } => {
            let mut port = open_port(options.settings(&config, Some(port.as_str())))?;
            let bytes = read_bytes(&mut port, *count)?;
            for row in bytes.chunks(DUMP_ROW) {
                println!("{}", hex_row(row));
            }
        }
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

fn list_ports(json: bool) -> Result<(), serde_json::Error> {
    let ports = SerialPort::enumerate_ports();
    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else if ports.is_empty() {
        println!("No serial ports found.");
    } else {
        for port in &ports {
            println!("{}", port);
        }
    }
    Ok(())
}

fn open_port(settings: Settings) -> Result<SerialPort, serial_port::PortError> {
    let mut port = SerialPort::with_settings(settings);
    port.open()?;
    Ok(port)
}

/// Read up to `count` bytes. Stops early when a timed read comes back empty.
fn read_bytes(port: &mut SerialPort, count: usize) -> Result<Vec<u8>, serial_port::PortError> {
    let timed = !port.settings().timeout().is_zero();
    let mut bytes = vec![0u8; count];
    let mut filled = 0;
    while filled < count {
        let n = port.read_data(&mut bytes[filled..])?;
        if n == 0 && timed {
            debug!("Read timed out after {} bytes", filled);
            break;
        }
        filled += n;
    }
    bytes.truncate(filled);
    Ok(bytes)
}

fn hex_row(row: &[u8]) -> String {
    row.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_port_options_override_config() {
        let mut config = Config::default();
        config
            .serial
            .port_aliases
            .insert("gps".to_string(), "/dev/ttyACM0".to_string());

        let cli = Cli::parse_from([
            "serial-port",
            "send",
            "gps",
            "hi",
            "--baud",
            "115200",
            "--parity",
            "even",
            "--stop-bits",
            "2",
            "--flow-control",
            "--timeout-ms",
            "250",
        ]);
        let Command::Send { port, options, .. } = cli.command else {
            panic!("expected send");
        };
        let settings = options.settings(&config, Some(port.as_str()));
        assert_eq!(
            settings,
            Settings::from_parts("/dev/ttyACM0", 115200, Parity::Even, StopBits::Two, true, 0, 250)
        );
    }

    #[test]
    fn test_show_without_port_uses_configured_default() {
        let config = Config::default();
        let settings = PortOptions::default().settings(&config, None);
        assert_eq!(settings, config.serial.defaults);
    }

    #[test]
    fn test_hex_row() {
        assert_eq!(hex_row(&[0x00, 0x0a, 0xff]), "00 0A FF");
        assert_eq!(hex_row(&[]), "");
    }
}
