//! Serial Driver Library
//!
//! Safe, single-owner access to serial devices. A [`SerialPort`] owns one
//! device session opened through a [`DeviceTransport`] driver and exposes
//! blocking byte-level read, write, available and flush operations with a
//! deterministic open/close lifecycle.
//!
//! # Modules
//!
//! - `driver`: The driver seam, the native `serialport` driver and the loopback test driver
//! - `port`: `SerialPort`, its stream views and the async wrapper
//! - `error`: Port-level error handling
//! - `config`: Configuration management with TOML support
//! - `logging`: Tracing subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use serial_driver::SerialPort;
//! use std::io::{Read, Write};
//!
//! let port = SerialPort::open("/dev/ttyUSB0", "baudrate=115200;autocts=off;autorts=off")?;
//! port.output().write_all(b"AT\r\n")?;
//!
//! let mut reply = [0u8; 64];
//! let n = port.input().read(&mut reply)?;
//! println!("{}", String::from_utf8_lossy(&reply[..n]));
//!
//! port.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod logging;
pub mod port;

// Re-export commonly used types for convenience
pub use driver::{
    DeviceHandle, DeviceTransport, DriverError, DriverOptions, LoopbackDriver, NativeDriver,
};
pub use error::{SerialError, SerialResult};
pub use port::{AsyncSerialPort, InputStream, OutputStream, SerialPort};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
