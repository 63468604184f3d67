//! Native driver backed by the `serialport` crate.
//!
//! Each session owns two clones of the OS port, one per direction, so a
//! blocked reader never holds up a writer. In blocking mode reads poll the
//! device in short slices and check the session's cancel flag between them.

use super::error::DriverError;
use super::options::DriverOptions;
use super::{DeviceHandle, DeviceTransport, HexBytes, RawHandle};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Poll interval used for blocking reads.
pub const BLOCKING_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Session {
    port_name: String,
    options: DriverOptions,
    reader: Mutex<Box<dyn serialport::SerialPort>>,
    writer: Mutex<Box<dyn serialport::SerialPort>>,
    cancelled: AtomicBool,
}

impl Session {
    fn check_cancelled(&self) -> Result<(), DriverError> {
        if self.cancelled.load(Ordering::Acquire) {
            Err(DriverError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Driver for real serial devices.
pub struct NativeDriver {
    sessions: RwLock<HashMap<RawHandle, Arc<Session>>>,
    next_handle: AtomicI32,
}

impl Default for NativeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeDriver {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_handle: AtomicI32::new(1),
        }
    }

    /// Number of sessions currently open through this driver.
    pub fn open_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    fn session(&self, handle: &DeviceHandle) -> Result<Arc<Session>, DriverError> {
        self.sessions
            .read()
            .get(&handle.as_raw())
            .cloned()
            .ok_or(DriverError::InvalidHandle(handle.as_raw()))
    }

    fn open_device(
        port_name: &str,
        options: &DriverOptions,
    ) -> Result<Box<dyn serialport::SerialPort>, DriverError> {
        let timeout = if options.blocking {
            BLOCKING_POLL_INTERVAL
        } else {
            options.timeout
        };

        serialport::new(port_name, options.baud_rate)
            .data_bits(options.data_bits.into())
            .flow_control(options.flow_control().into())
            .parity(options.parity.into())
            .stop_bits(options.stop_bits.into())
            .timeout(timeout)
            .open()
            .map_err(|e| open_error(port_name, e))
    }

    fn read_some(session: &Session, buf: &mut [u8]) -> Result<usize, DriverError> {
        let mut port = session.reader.lock();
        loop {
            session.check_cancelled()?;
            match port.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut && session.options.blocking => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// `serialport` reports a device held under another exclusive lock as
/// `NoDevice`; a missing path arrives as `Io(NotFound)`.
fn open_error(port_name: &str, e: serialport::Error) -> DriverError {
    match e.kind() {
        serialport::ErrorKind::NoDevice => DriverError::busy(port_name),
        serialport::ErrorKind::Io(ErrorKind::NotFound) => DriverError::not_found(port_name),
        _ => DriverError::Serial(e),
    }
}

impl DeviceTransport for NativeDriver {
    fn open(&self, port_name: &str, options: &str) -> Result<DeviceHandle, DriverError> {
        debug!(port = port_name, options, "opening device");
        let parsed = DriverOptions::parse(options)?;
        if !parsed.blocking {
            debug!(port = port_name, timeout = ?parsed.timeout, "non-blocking reads");
        }

        if self
            .sessions
            .read()
            .values()
            .any(|session| session.port_name == port_name)
        {
            return Err(DriverError::busy(port_name));
        }

        let reader = Self::open_device(port_name, &parsed)?;
        let writer = reader.try_clone()?;

        let raw = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(Session {
            port_name: port_name.to_string(),
            options: parsed,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            cancelled: AtomicBool::new(false),
        });
        // Another open of the same name may have won the race since the check above.
        let mut sessions = self.sessions.write();
        if sessions.values().any(|other| other.port_name == port_name) {
            return Err(DriverError::busy(port_name));
        }
        sessions.insert(raw, session);
        drop(sessions);

        debug!(port = port_name, handle = raw, "open success");
        Ok(DeviceHandle::from_raw(raw))
    }

    fn close(&self, handle: DeviceHandle) {
        match self.sessions.write().remove(&handle.as_raw()) {
            Some(session) => {
                session.cancelled.store(true, Ordering::Release);
                debug!(port = %session.port_name, %handle, "close");
            }
            None => warn!(%handle, "close on unknown handle"),
        }
    }

    fn cancel(&self, handle: &DeviceHandle) {
        if let Ok(session) = self.session(handle) {
            session.cancelled.store(true, Ordering::Release);
        }
    }

    fn available(&self, handle: &DeviceHandle) -> Result<usize, DriverError> {
        let session = self.session(handle)?;
        session.check_cancelled()?;
        let count = session.reader.lock().bytes_to_read()?;
        trace!(%handle, count, "available");
        Ok(count as usize)
    }

    fn read_byte(&self, handle: &DeviceHandle) -> Result<Option<u8>, DriverError> {
        let session = self.session(handle)?;
        let mut byte = [0u8; 1];
        let n = Self::read_some(&session, &mut byte)?;
        let result = (n == 1).then_some(byte[0]);
        trace!(%handle, byte = ?result, "read byte");
        Ok(result)
    }

    fn read(&self, handle: &DeviceHandle, buf: &mut [u8]) -> Result<usize, DriverError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let session = self.session(handle)?;
        let n = Self::read_some(&session, buf)?;
        trace!(%handle, bytes = %HexBytes(&buf[..n]), "read");
        Ok(n)
    }

    fn write_byte(&self, handle: &DeviceHandle, byte: u8) -> Result<(), DriverError> {
        self.write(handle, &[byte])
    }

    fn write(&self, handle: &DeviceHandle, buf: &[u8]) -> Result<(), DriverError> {
        let session = self.session(handle)?;
        let mut port = session.writer.lock();
        let mut written = 0;
        while written < buf.len() {
            session.check_cancelled()?;
            match port.write(&buf[written..]) {
                Ok(0) => return Err(std::io::Error::from(ErrorKind::WriteZero).into()),
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::TimedOut && session.options.blocking => continue,
                Err(e) => return Err(e.into()),
            }
        }
        trace!(%handle, bytes = %HexBytes(buf), "write");
        Ok(())
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn flush(&self, handle: &DeviceHandle) -> Result<(), DriverError> {
        let session = self.session(handle)?;
        session.check_cancelled()?;
        session.writer.lock().flush()?;
        trace!(%handle, "flush");
        Ok(())
    }
}
