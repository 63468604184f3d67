//! In-process loopback driver.
//!
//! Every byte written to a loopback device becomes readable from the same
//! device. Devices are registered by name up front, can be fed inbound data,
//! hung up, or made to fail, which makes this driver the test double for
//! everything above the [`DeviceTransport`] seam.
//!
//! # Example
//! ```
//! use serial_driver::driver::{DeviceTransport, LoopbackDriver};
//!
//! let driver = LoopbackDriver::new().with_device("loop0");
//! let handle = driver.open("loop0", "").unwrap();
//!
//! driver.write(&handle, b"ping").unwrap();
//! let mut buf = [0u8; 4];
//! assert_eq!(driver.read(&handle, &mut buf).unwrap(), 4);
//! assert_eq!(&buf, b"ping");
//!
//! driver.close(handle);
//! ```

use super::error::DriverError;
use super::options::DriverOptions;
use super::{DeviceHandle, DeviceTransport, HexBytes, RawHandle};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// State of one virtual device, shared by the driver and its open session.
#[derive(Debug, Default)]
struct LoopbackDevice {
    line: Mutex<Line>,
    data_ready: Condvar,
    in_use: AtomicBool,
    io_calls: AtomicUsize,
    flushes: AtomicUsize,
}

#[derive(Debug, Default)]
struct Line {
    /// Bytes waiting to be read.
    rx: VecDeque<u8>,
    /// Every byte ever written, in order.
    transcript: Vec<u8>,
    hung_up: bool,
    fail_next: bool,
}

#[derive(Debug)]
struct Session {
    name: String,
    device: Arc<LoopbackDevice>,
    cancelled: AtomicBool,
}

/// Driver whose devices echo writes back to the reader.
#[derive(Debug)]
pub struct LoopbackDriver {
    devices: Mutex<HashMap<String, Arc<LoopbackDevice>>>,
    sessions: Mutex<HashMap<RawHandle, Arc<Session>>>,
    next_handle: AtomicI32,
    flush_supported: bool,
}

impl Default for LoopbackDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackDriver {
    /// Create a driver with no devices and flush support enabled.
    pub fn new() -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            next_handle: AtomicI32::new(1),
            flush_supported: true,
        }
    }

    /// Register a device that `open` will accept.
    pub fn with_device(self, name: impl Into<String>) -> Self {
        self.add_device(name);
        self
    }

    /// Report flush as unsupported, like a driver without a drain call.
    pub fn without_flush(mut self) -> Self {
        self.flush_supported = false;
        self
    }

    pub fn add_device(&self, name: impl Into<String>) {
        self.devices
            .lock()
            .entry(name.into())
            .or_insert_with(|| Arc::new(LoopbackDevice::default()));
    }

    fn device(&self, name: &str) -> Option<Arc<LoopbackDevice>> {
        self.devices.lock().get(name).cloned()
    }

    /// Queue bytes as if the remote end had sent them.
    pub fn inject(&self, name: &str, data: &[u8]) {
        if let Some(device) = self.device(name) {
            device.line.lock().rx.extend(data);
            device.data_ready.notify_all();
        }
    }

    /// Everything written to the device so far.
    pub fn transcript(&self, name: &str) -> Vec<u8> {
        self.device(name)
            .map(|device| device.line.lock().transcript.clone())
            .unwrap_or_default()
    }

    /// Simulate the device going away. Readers drain what is queued and then
    /// see end of stream; writes and `available` fail.
    pub fn hang_up(&self, name: &str) {
        if let Some(device) = self.device(name) {
            device.line.lock().hung_up = true;
            device.data_ready.notify_all();
        }
    }

    /// Make the next read, write, available or flush call on the device fail.
    pub fn fail_next_io(&self, name: &str) {
        if let Some(device) = self.device(name) {
            device.line.lock().fail_next = true;
        }
    }

    /// Number of read, write, available and flush calls that reached the device.
    pub fn io_calls(&self, name: &str) -> usize {
        self.device(name)
            .map(|device| device.io_calls.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn flush_count(&self, name: &str) -> usize {
        self.device(name)
            .map(|device| device.flushes.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn is_open(&self, name: &str) -> bool {
        self.device(name)
            .map(|device| device.in_use.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn session(&self, handle: &DeviceHandle) -> Result<Arc<Session>, DriverError> {
        self.sessions
            .lock()
            .get(&handle.as_raw())
            .cloned()
            .ok_or(DriverError::InvalidHandle(handle.as_raw()))
    }

    /// Resolve `handle` and run the common per-call checks with the line locked.
    fn with_line<T>(
        &self,
        handle: &DeviceHandle,
        op: impl FnOnce(&Session, &mut Line) -> Result<T, DriverError>,
    ) -> Result<T, DriverError> {
        let session = self.session(handle)?;
        if session.cancelled.load(Ordering::Acquire) {
            return Err(DriverError::Cancelled);
        }
        session.device.io_calls.fetch_add(1, Ordering::SeqCst);
        let mut line = session.device.line.lock();
        if std::mem::take(&mut line.fail_next) {
            return Err(std::io::Error::other("injected failure").into());
        }
        op(&*session, &mut *line)
    }

    fn read_blocking(&self, handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize, DriverError> {
        let session = self.session(handle)?;
        let device = &session.device;
        device.io_calls.fetch_add(1, Ordering::SeqCst);

        let mut line = device.line.lock();
        if std::mem::take(&mut line.fail_next) {
            return Err(std::io::Error::other("injected failure").into());
        }
        loop {
            if session.cancelled.load(Ordering::Acquire) {
                return Err(DriverError::Cancelled);
            }
            if !line.rx.is_empty() {
                let n = buf.len().min(line.rx.len());
                for (slot, byte) in buf.iter_mut().zip(line.rx.drain(..n)) {
                    *slot = byte;
                }
                trace!(device = %session.name, bytes = %HexBytes(&buf[..n]), "loopback read");
                return Ok(n);
            }
            if line.hung_up {
                return Ok(0);
            }
            device.data_ready.wait(&mut line);
        }
    }
}

impl DeviceTransport for LoopbackDriver {
    fn open(&self, port_name: &str, options: &str) -> Result<DeviceHandle, DriverError> {
        DriverOptions::parse(options)?;
        let device = self
            .device(port_name)
            .ok_or_else(|| DriverError::not_found(port_name))?;
        if device.in_use.swap(true, Ordering::SeqCst) {
            return Err(DriverError::busy(port_name));
        }
        device.line.lock().hung_up = false;

        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.sessions.lock().insert(
            raw,
            Arc::new(Session {
                name: port_name.to_string(),
                device,
                cancelled: AtomicBool::new(false),
            }),
        );
        debug!(device = port_name, handle = raw, "loopback open");
        Ok(DeviceHandle::from_raw(raw))
    }

    fn close(&self, handle: DeviceHandle) {
        let removed = self.sessions.lock().remove(&handle.as_raw());
        if let Some(session) = removed {
            session.cancelled.store(true, Ordering::Release);
            // Take the line lock so a reader between its flag check and wait() is not missed.
            drop(session.device.line.lock());
            session.device.data_ready.notify_all();
            session.device.in_use.store(false, Ordering::SeqCst);
            debug!(device = %session.name, %handle, "loopback close");
        }
    }

    fn cancel(&self, handle: &DeviceHandle) {
        if let Ok(session) = self.session(handle) {
            session.cancelled.store(true, Ordering::Release);
            drop(session.device.line.lock());
            session.device.data_ready.notify_all();
        }
    }

    fn available(&self, handle: &DeviceHandle) -> Result<usize, DriverError> {
        self.with_line(handle, |session, line| {
            if line.hung_up && line.rx.is_empty() {
                return Err(DriverError::disconnected(&session.name));
            }
            Ok(line.rx.len())
        })
    }

    fn read_byte(&self, handle: &DeviceHandle) -> Result<Option<u8>, DriverError> {
        let mut byte = [0u8; 1];
        let n = self.read_blocking(handle, &mut byte)?;
        Ok((n == 1).then_some(byte[0]))
    }

    fn read(&self, handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize, DriverError> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.read_blocking(handle, buf)
    }

    fn write_byte(&self, handle: &DeviceHandle, byte: u8) -> Result<(), DriverError> {
        self.write(handle, &[byte])
    }

    fn write(&self, handle: &DeviceHandle, buf: &[u8]) -> Result<(), DriverError> {
        let session = self.session(handle)?;
        self.with_line(handle, |session, line| {
            if line.hung_up {
                return Err(DriverError::disconnected(&session.name));
            }
            line.rx.extend(buf);
            line.transcript.extend_from_slice(buf);
            trace!(device = %session.name, bytes = %HexBytes(buf), "loopback write");
            Ok(())
        })?;
        session.device.data_ready.notify_all();
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        self.flush_supported
    }

    fn flush(&self, handle: &DeviceHandle) -> Result<(), DriverError> {
        if !self.flush_supported {
            return Ok(());
        }
        self.with_line(handle, |session, line| {
            if line.hung_up {
                return Err(DriverError::disconnected(&session.name));
            }
            session.device.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}
