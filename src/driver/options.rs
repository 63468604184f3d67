//! Options string understood by the bundled drivers.
//!
//! The grammar is `key=value` pairs separated by `;` (a `,` works too):
//!
//! ```text
//! baudrate=9600;bitsperchar=8;parity=none;stopbits=1;autocts=off;autorts=off
//! ```
//!
//! `SerialPort` never looks inside this string. Only drivers parse it, and a
//! driver may define its own format entirely.

use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Baud rates the driver can program.
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// Reasons an options string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionsError {
    #[error("Invalid option {0}")]
    UnknownKey(String),

    #[error("Missing value for option {0}")]
    MissingValue(String),

    #[error("Unsupported baud rate {0}")]
    UnsupportedBaudRate(String),

    #[error("Unsupported data size {0}")]
    UnsupportedDataSize(String),

    #[error("Unsupported parity {0}")]
    UnsupportedParity(String),

    #[error("Unsupported stop bits {0}")]
    UnsupportedStopBits(String),

    #[error("Invalid value {value:?} for {key}: expected on or off")]
    InvalidSwitch { key: String, value: String },

    #[error("Invalid timeout {0}")]
    InvalidTimeout(String),
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parsed driver options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverOptions {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// Block reads until data arrives instead of timing out.
    pub blocking: bool,
    pub auto_cts: bool,
    pub auto_rts: bool,
    /// Read timeout when `blocking` is off.
    pub timeout: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            baud_rate: 57600,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            blocking: true,
            auto_cts: true,
            auto_rts: true,
            timeout: Duration::from_millis(1000),
        }
    }
}

impl DriverOptions {
    /// Parse an options string, starting from the defaults.
    pub fn parse(input: &str) -> Result<Self, OptionsError> {
        let mut options = Self::default();

        for segment in input.split([';', ',']) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }

            let (key, value) = segment
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| OptionsError::MissingValue(segment.to_string()))?;
            if value.is_empty() {
                return Err(OptionsError::MissingValue(key.to_string()));
            }

            match key {
                "baudrate" => {
                    options.baud_rate = value
                        .parse()
                        .ok()
                        .filter(|rate| SUPPORTED_BAUD_RATES.contains(rate))
                        .ok_or_else(|| OptionsError::UnsupportedBaudRate(value.to_string()))?;
                }
                "bitsperchar" => {
                    options.data_bits = match value {
                        "7" => DataBits::Seven,
                        "8" => DataBits::Eight,
                        _ => return Err(OptionsError::UnsupportedDataSize(value.to_string())),
                    };
                }
                "stopbits" => {
                    options.stop_bits = match value {
                        "1" => StopBits::One,
                        "2" => StopBits::Two,
                        _ => return Err(OptionsError::UnsupportedStopBits(value.to_string())),
                    };
                }
                // Only the first character counts: "n", "none" and "NONE" all match.
                "parity" => {
                    options.parity = match value.chars().next().map(|c| c.to_ascii_lowercase()) {
                        Some('n') => Parity::None,
                        Some('o') => Parity::Odd,
                        Some('e') => Parity::Even,
                        _ => return Err(OptionsError::UnsupportedParity(value.to_string())),
                    };
                }
                "blocking" => options.blocking = parse_switch(key, value)?,
                "autocts" => options.auto_cts = parse_switch(key, value)?,
                "autorts" => options.auto_rts = parse_switch(key, value)?,
                "timeout" => {
                    let millis: u64 = value
                        .parse()
                        .map_err(|_| OptionsError::InvalidTimeout(value.to_string()))?;
                    options.timeout = Duration::from_millis(millis);
                }
                other => return Err(OptionsError::UnknownKey(other.to_string())),
            }
        }

        Ok(options)
    }

    /// RTS/CTS is only enabled when both automatic lines are on.
    pub fn flow_control(&self) -> FlowControl {
        if self.auto_cts && self.auto_rts {
            FlowControl::Hardware
        } else {
            FlowControl::None
        }
    }
}

impl FromStr for DriverOptions {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn parse_switch(key: &str, value: &str) -> Result<bool, OptionsError> {
    match value {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(OptionsError::InvalidSwitch {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
