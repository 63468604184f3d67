//! The serial port handle.

use super::stream::{InputStream, OutputStream};
use crate::driver::{self, DeviceHandle, DeviceTransport, DriverError};
use crate::error::{SerialError, SerialResult};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One open serial device.
///
/// The port exclusively owns its [`DeviceHandle`]. Read-side operations
/// (`bytes_available`, `read_byte`, `read_into`) are serialized against each
/// other, as are write-side operations (`write_byte`, `write_from`, `flush`);
/// a read and a write may run at the same time. The port is `Sync`, so it can
/// be shared across threads by reference or through an `Arc`.
///
/// Once [`close`](Self::close) has been called every data operation fails
/// with [`SerialError::Closed`].
///
/// # Example
/// ```
/// use serial_driver::{driver::LoopbackDriver, SerialPort};
/// use std::sync::Arc;
///
/// let driver = Arc::new(LoopbackDriver::new().with_device("loop0"));
/// let port = SerialPort::open_with(driver, "loop0", "baudrate=9600").unwrap();
///
/// port.write_from(b"AT\r\n", 0, 4).unwrap();
/// let mut buf = [0u8; 8];
/// let n = port.read_into(&mut buf, 0, 8).unwrap();
/// assert_eq!(&buf[..n], b"AT\r\n");
///
/// port.close();
/// assert!(port.read_byte().is_err());
/// ```
pub struct SerialPort {
    driver: Arc<dyn DeviceTransport>,
    port_name: String,
    options: String,
    /// `None` once the handle has been released.
    handle: RwLock<Option<DeviceHandle>>,
    closed: AtomicBool,
    read_lock: Mutex<()>,
    write_lock: Mutex<()>,
}

impl SerialPort {
    /// Open `port_name` through the process-wide native driver.
    ///
    /// `options` is handed to the driver untouched; see
    /// [`DriverOptions`](crate::driver::DriverOptions) for the native format.
    pub fn open(port_name: &str, options: &str) -> SerialResult<Self> {
        Self::open_with(driver::native(), port_name, options)
    }

    /// Open `port_name` through an explicit driver.
    pub fn open_with(
        driver: Arc<dyn DeviceTransport>,
        port_name: &str,
        options: &str,
    ) -> SerialResult<Self> {
        let handle = driver
            .open(port_name, options)
            .map_err(|source| SerialError::Open {
                port: port_name.to_string(),
                source,
            })?;

        Ok(Self {
            driver,
            port_name: port_name.to_string(),
            options: options.to_string(),
            handle: RwLock::new(Some(handle)),
            closed: AtomicBool::new(false),
            read_lock: Mutex::new(()),
            write_lock: Mutex::new(()),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn options(&self) -> &str {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire)
    }

    /// Whether [`flush`](Self::flush) reaches the device. When it does not,
    /// `flush` succeeds without doing anything.
    pub fn supports_flush(&self) -> bool {
        self.driver.supports_flush()
    }

    /// Read-side view implementing [`std::io::Read`].
    pub fn input(&self) -> InputStream<'_> {
        InputStream::new(self)
    }

    /// Write-side view implementing [`std::io::Write`].
    pub fn output(&self) -> OutputStream<'_> {
        OutputStream::new(self)
    }

    /// Number of bytes that can be read without blocking.
    pub fn bytes_available(&self) -> SerialResult<usize> {
        let _direction = self.read_lock.lock();
        self.with_handle(|driver, handle| driver.available(handle))
    }

    /// Block until one byte arrives. `None` means end of stream.
    pub fn read_byte(&self) -> SerialResult<Option<u8>> {
        let _direction = self.read_lock.lock();
        self.with_handle(|driver, handle| driver.read_byte(handle))
    }

    /// Read up to `len` bytes into `buf[offset..offset + len]`.
    ///
    /// Blocks until at least one byte is available and returns how many were
    /// read, which may be fewer than `len`. A return of `0` for a non-zero
    /// `len` means end of stream. A zero `len` returns `0` without touching
    /// the device.
    pub fn read_into(&self, buf: &mut [u8], offset: usize, len: usize) -> SerialResult<usize> {
        SerialError::check_bounds(offset, len, buf.len())?;
        let _direction = self.read_lock.lock();
        self.with_handle(|driver, handle| {
            if len == 0 {
                return Ok(0);
            }
            driver.read(handle, &mut buf[offset..offset + len])
        })
    }

    /// Write a single byte.
    pub fn write_byte(&self, value: u8) -> SerialResult<()> {
        let _direction = self.write_lock.lock();
        self.with_handle(|driver, handle| driver.write_byte(handle, value))
    }

    /// Write exactly `len` bytes from `buf[offset..offset + len]`.
    ///
    /// Not safe to retry after an `Io` error: part of the data may already
    /// have gone out.
    pub fn write_from(&self, buf: &[u8], offset: usize, len: usize) -> SerialResult<()> {
        SerialError::check_bounds(offset, len, buf.len())?;
        let _direction = self.write_lock.lock();
        self.with_handle(|driver, handle| {
            if len == 0 {
                return Ok(());
            }
            driver.write(handle, &buf[offset..offset + len])
        })
    }

    /// Hand written bytes to the device. This means submitted, not transmitted.
    pub fn flush(&self) -> SerialResult<()> {
        let _direction = self.write_lock.lock();
        self.with_handle(|driver, handle| {
            if driver.supports_flush() {
                driver.flush(handle)
            } else {
                Ok(())
            }
        })
    }

    /// Release the device.
    ///
    /// New operations fail with [`SerialError::Closed`] from the moment this
    /// is called. Blocking calls already in flight are cancelled through the
    /// driver and drained before the handle is released. Driver failures are
    /// swallowed, and calling `close` again does nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(handle) = self.handle.read().as_ref() {
            self.driver.cancel(handle);
        }

        let released = self.handle.write().take();
        if let Some(handle) = released {
            self.driver.close(handle);
        }
    }

    fn with_handle<T>(
        &self,
        op: impl FnOnce(&dyn DeviceTransport, &DeviceHandle) -> Result<T, DriverError>,
    ) -> SerialResult<T> {
        let guard = self.handle.read();
        let handle = match guard.as_ref() {
            Some(handle) if self.is_open() => handle,
            _ => return Err(SerialError::Closed),
        };

        op(self.driver.as_ref(), handle).map_err(|err| match err {
            DriverError::Cancelled => SerialError::Closed,
            other => SerialError::Io(other),
        })
    }
}

impl Drop for SerialPort {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPort")
            .field("port_name", &self.port_name)
            .field("options", &self.options)
            .field("open", &self.is_open())
            .finish()
    }
}
