//! Driver-level error types.
//!
//! These describe failures of the device collaborator itself. The port layer
//! wraps them into [`crate::SerialError`] so callers see which operation failed.

use super::options::OptionsError;
use super::RawHandle;
use thiserror::Error;

/// Errors reported by a [`super::DeviceTransport`] implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The named device does not exist.
    #[error("device not found: {0}")]
    NotFound(String),

    /// The named device is already held exclusively.
    #[error("device busy: {0}")]
    Busy(String),

    /// The options string was rejected before the device was touched.
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),

    /// The handle does not belong to an open session of this driver.
    #[error("invalid handle: {0}")]
    InvalidHandle(RawHandle),

    /// A blocking call was abandoned because the session is being closed.
    #[error("operation cancelled by close")]
    Cancelled,

    /// The device went away underneath an open session.
    #[error("device disconnected: {0}")]
    Disconnected(String),

    /// An I/O error occurred while talking to the device.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl DriverError {
    /// Create a NotFound error from a device name.
    pub fn not_found(device: impl Into<String>) -> Self {
        Self::NotFound(device.into())
    }

    /// Create a Busy error from a device name.
    pub fn busy(device: impl Into<String>) -> Self {
        Self::Busy(device.into())
    }

    /// Create a Disconnected error from a device name.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected(device.into())
    }

    /// The `std::io::ErrorKind` closest to this failure.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        use std::io::ErrorKind;
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Busy(_) => ErrorKind::AddrInUse,
            Self::InvalidOptions(_) => ErrorKind::InvalidInput,
            Self::InvalidHandle(_) => ErrorKind::InvalidInput,
            Self::Cancelled => ErrorKind::Interrupted,
            Self::Disconnected(_) => ErrorKind::NotConnected,
            Self::Io(e) => e.kind(),
            Self::Serial(e) => match e.kind() {
                serialport::ErrorKind::NoDevice => ErrorKind::AddrInUse,
                serialport::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
                serialport::ErrorKind::Io(kind) => kind,
                serialport::ErrorKind::Unknown => ErrorKind::Other,
            },
        }
    }
}
