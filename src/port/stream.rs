//! Byte-stream views over a [`SerialPort`].
//!
//! The views only borrow the port, so they cannot outlive it. They are `Copy`:
//! each thread can take its own view and the port's direction locks keep the
//! calls serialized.

use super::serial::SerialPort;
use crate::error::SerialResult;
use std::io;

/// Read side of a port.
#[derive(Debug, Clone, Copy)]
pub struct InputStream<'a> {
    port: &'a SerialPort,
}

impl<'a> InputStream<'a> {
    pub(crate) fn new(port: &'a SerialPort) -> Self {
        Self { port }
    }

    pub fn available(&self) -> SerialResult<usize> {
        self.port.bytes_available()
    }

    pub fn read_byte(&self) -> SerialResult<Option<u8>> {
        self.port.read_byte()
    }

    pub fn port(&self) -> &'a SerialPort {
        self.port
    }
}

impl io::Read for InputStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.port.read_into(buf, 0, len)?)
    }
}

/// Write side of a port.
#[derive(Debug, Clone, Copy)]
pub struct OutputStream<'a> {
    port: &'a SerialPort,
}

impl<'a> OutputStream<'a> {
    pub(crate) fn new(port: &'a SerialPort) -> Self {
        Self { port }
    }

    pub fn write_byte(&self, value: u8) -> SerialResult<()> {
        self.port.write_byte(value)
    }

    pub fn port(&self) -> &'a SerialPort {
        self.port
    }
}

impl io::Write for OutputStream<'_> {
    /// Writes the whole buffer in one locked call, so concurrent writers never interleave.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write_from(buf, 0, buf.len())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.port.flush()?)
    }
}
