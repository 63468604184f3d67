//! Async access to a [`SerialPort`].
//!
//! Every call runs on tokio's blocking pool so a device that is slow to answer
//! never stalls the async runtime. The port's own locking still applies.

use super::serial::SerialPort;
use crate::driver::DriverError;
use crate::error::{SerialError, SerialResult};
use std::sync::Arc;
use tokio::task::JoinError;

/// Wrapper that runs port operations through `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct AsyncSerialPort {
    inner: Arc<SerialPort>,
}

impl AsyncSerialPort {
    pub fn new(port: SerialPort) -> Self {
        Self {
            inner: Arc::new(port),
        }
    }

    /// Open a port through the native driver without blocking the runtime.
    pub async fn open(port_name: &str, options: &str) -> SerialResult<Self> {
        let port_name = port_name.to_string();
        let options = options.to_string();
        let port = tokio::task::spawn_blocking(move || SerialPort::open(&port_name, &options))
            .await
            .map_err(join_error)??;
        Ok(Self::new(port))
    }

    /// The shared synchronous port.
    pub fn get_ref(&self) -> &Arc<SerialPort> {
        &self.inner
    }

    pub fn port_name(&self) -> &str {
        self.inner.port_name()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    async fn run<T, F>(&self, op: F) -> SerialResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SerialPort) -> SerialResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&*inner))
            .await
            .map_err(join_error)?
    }

    pub async fn bytes_available(&self) -> SerialResult<usize> {
        self.run(|port| port.bytes_available()).await
    }

    pub async fn read_byte(&self) -> SerialResult<Option<u8>> {
        self.run(|port| port.read_byte()).await
    }

    /// Read up to `max_len` bytes. An empty vector for a non-zero `max_len`
    /// means end of stream.
    pub async fn read(&self, max_len: usize) -> SerialResult<Vec<u8>> {
        self.run(move |port| {
            let mut buffer = vec![0u8; max_len];
            let n = port.read_into(&mut buffer, 0, max_len)?;
            buffer.truncate(n);
            Ok(buffer)
        })
        .await
    }

    pub async fn write_byte(&self, value: u8) -> SerialResult<()> {
        self.run(move |port| port.write_byte(value)).await
    }

    pub async fn write(&self, data: Vec<u8>) -> SerialResult<()> {
        self.run(move |port| port.write_from(&data, 0, data.len())).await
    }

    pub async fn flush(&self) -> SerialResult<()> {
        self.run(|port| port.flush()).await
    }

    /// Close the port. Pending reads on other tasks finish with `Closed`.
    pub async fn close(&self) {
        let inner = Arc::clone(&self.inner);
        // close() never fails; a join error only means the pool is shutting down.
        let _ = tokio::task::spawn_blocking(move || inner.close()).await;
    }
}

fn join_error(err: JoinError) -> SerialError {
    SerialError::Io(DriverError::Io(std::io::Error::other(err)))
}
