//! Device driver seam.
//!
//! A [`DeviceTransport`] is the external collaborator that performs the real
//! device I/O. Sessions are identified by a [`DeviceHandle`], which is
//! move-only: [`DeviceTransport::close`] consumes it, so a stale handle cannot
//! be passed back to the driver by accident.

pub mod error;
pub mod loopback;
pub mod native;
pub mod options;

pub use error::DriverError;
pub use loopback::LoopbackDriver;
pub use native::NativeDriver;
pub use options::{DataBits, DriverOptions, FlowControl, OptionsError, Parity, StopBits};

use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

/// The integer a driver uses to identify a session.
pub type RawHandle = i32;

/// Opaque, move-only token for one open device session.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct DeviceHandle(RawHandle);

impl DeviceHandle {
    /// Wrap a raw session id. Only drivers should mint handles.
    pub fn from_raw(raw: RawHandle) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> RawHandle {
        self.0
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Operations a serial device driver provides.
///
/// All calls may block. Implementations must be safe to call from several
/// threads at once; the port layer guarantees that at most one read-side and
/// one write-side call are in flight per handle.
#[cfg_attr(test, mockall::automock)]
pub trait DeviceTransport: Send + Sync {
    /// Open `port_name` using the driver-defined `options` string.
    fn open(&self, port_name: &str, options: &str) -> Result<DeviceHandle, DriverError>;

    /// Release the session. Failures are not reported.
    fn close(&self, handle: DeviceHandle);

    /// Abort blocking calls in flight on `handle` and make later ones fail
    /// with [`DriverError::Cancelled`].
    fn cancel(&self, handle: &DeviceHandle);

    /// Number of bytes readable without blocking.
    fn available(&self, handle: &DeviceHandle) -> Result<usize, DriverError>;

    /// Read one byte, or `None` at end of stream.
    fn read_byte(&self, handle: &DeviceHandle) -> Result<Option<u8>, DriverError>;

    /// Read up to `buf.len()` bytes. `Ok(0)` for a non-empty `buf` is end of stream.
    fn read(&self, handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize, DriverError>;

    fn write_byte(&self, handle: &DeviceHandle, byte: u8) -> Result<(), DriverError>;

    /// Write every byte of `buf`.
    fn write(&self, handle: &DeviceHandle, buf: &[u8]) -> Result<(), DriverError>;

    /// Whether [`flush`](Self::flush) does anything.
    fn supports_flush(&self) -> bool {
        false
    }

    /// Hand buffered output to the device.
    fn flush(&self, _handle: &DeviceHandle) -> Result<(), DriverError> {
        Ok(())
    }
}

static NATIVE: Lazy<Arc<NativeDriver>> = Lazy::new(|| Arc::new(NativeDriver::new()));

/// The process-wide native driver.
pub fn native() -> Arc<dyn DeviceTransport> {
    Arc::clone(&NATIVE) as Arc<dyn DeviceTransport>
}

/// Formats a byte slice as space separated hex, for trace output.
pub(crate) struct HexBytes<'a>(pub &'a [u8]);

impl fmt::Display for HexBytes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}
