//! Errors surfaced by [`crate::SerialPort`].

use crate::driver::DriverError;
use std::io;
use thiserror::Error;

/// A specialized `Result` type for port operations.
pub type SerialResult<T> = Result<T, SerialError>;

/// Failures of a serial port operation.
///
/// Nothing is retried or logged at this layer; every error reaches the caller
/// of the operation that produced it.
#[derive(Debug, Error)]
pub enum SerialError {
    /// The device is missing, busy, or rejected the options string.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: DriverError,
    },

    /// The device reported a failure during available, read, write or flush.
    #[error("I/O error: {0}")]
    Io(#[source] DriverError),

    /// `offset + len` does not fit the supplied buffer. Checked before any device I/O.
    #[error("range {offset}+{len} is out of bounds for a buffer of length {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// The port has been closed.
    #[error("serial port is closed")]
    Closed,
}

impl SerialError {
    /// Check that `buf[offset..offset + len]` is addressable.
    pub(crate) fn check_bounds(offset: usize, len: usize, capacity: usize) -> SerialResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(Self::OutOfBounds {
                offset,
                len,
                capacity,
            }),
        }
    }
}

impl From<SerialError> for io::Error {
    fn from(err: SerialError) -> Self {
        match err {
            SerialError::Io(DriverError::Io(inner)) => inner,
            other => {
                let kind = match &other {
                    SerialError::Io(driver) | SerialError::Open { source: driver, .. } => {
                        driver.io_kind()
                    }
                    SerialError::OutOfBounds { .. } => io::ErrorKind::InvalidInput,
                    SerialError::Closed => io::ErrorKind::NotConnected,
                };
                io::Error::new(kind, other)
            }
        }
    }
}
