//! Shared test utilities for serial-driver tests.
//!
//! This module provides common test infrastructure including:
//! - Loopback port creation
//! - Polling helpers for cross-thread assertions
//! - Test data builders

#![allow(dead_code)]

use serial_driver::driver::LoopbackDriver;
use serial_driver::SerialPort;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Default device name used by the helpers.
pub const LOOP_DEVICE: &str = "loop0";

/// Create a loopback driver with one device and a port opened on it.
///
/// # Example
/// ```ignore
/// let (driver, port) = open_loopback();
/// port.write_from(b"hi", 0, 2)?;
/// assert_eq!(driver.transcript(LOOP_DEVICE), b"hi");
/// ```
pub fn open_loopback() -> (Arc<LoopbackDriver>, SerialPort) {
    let driver = Arc::new(LoopbackDriver::new().with_device(LOOP_DEVICE));
    let port = SerialPort::open_with(driver.clone(), LOOP_DEVICE, "baudrate=115200")
        .expect("loopback device should open");
    (driver, port)
}

/// Same as [`open_loopback`] but for a driver that cannot flush.
pub fn open_loopback_without_flush() -> (Arc<LoopbackDriver>, SerialPort) {
    let driver = Arc::new(LoopbackDriver::new().with_device(LOOP_DEVICE).without_flush());
    let port = SerialPort::open_with(driver.clone(), LOOP_DEVICE, "")
        .expect("loopback device should open");
    (driver, port)
}

/// Read until `expected` bytes have arrived or the stream ends.
pub fn read_exactly(port: &SerialPort, expected: usize) -> Vec<u8> {
    let mut collected = vec![0u8; expected];
    let mut filled = 0;
    while filled < expected {
        let n = port
            .read_into(&mut collected, filled, expected - filled)
            .expect("read should succeed");
        if n == 0 {
            break;
        }
        filled += n;
    }
    collected.truncate(filled);
    collected
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// A frame of `len` copies of `tag`, used to spot interleaving.
pub fn frame(tag: u8, len: usize) -> Vec<u8> {
    vec![tag; len]
}
