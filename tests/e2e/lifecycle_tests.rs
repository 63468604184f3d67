//! Open/close lifecycle through the public API.

use crate::common::{open_loopback, LOOP_DEVICE};
use pretty_assertions::assert_eq;
use serial_driver::driver::{DriverError, LoopbackDriver};
use serial_driver::{SerialError, SerialPort};
use std::sync::Arc;

#[test]
fn test_open_missing_device_fails() {
    let driver = Arc::new(LoopbackDriver::new().with_device(LOOP_DEVICE));

    let err = SerialPort::open_with(driver.clone(), "loop7", "").unwrap_err();
    assert!(matches!(
        err,
        SerialError::Open {
            source: DriverError::NotFound(_),
            ..
        }
    ));
    assert!(!driver.is_open(LOOP_DEVICE));
}

#[test]
fn test_open_busy_device_fails() {
    let (driver, _port) = open_loopback();

    let err = SerialPort::open_with(driver, LOOP_DEVICE, "").unwrap_err();
    assert!(matches!(
        err,
        SerialError::Open {
            source: DriverError::Busy(_),
            ..
        }
    ));
}

#[test]
fn test_open_with_malformed_options_fails() {
    let driver = Arc::new(LoopbackDriver::new().with_device(LOOP_DEVICE));

    let err = SerialPort::open_with(driver.clone(), LOOP_DEVICE, "baudrate=fast").unwrap_err();
    match err {
        SerialError::Open { port, source } => {
            assert_eq!(port, LOOP_DEVICE);
            assert!(matches!(source, DriverError::InvalidOptions(_)));
        }
        other => panic!("Expected Open error, got: {:?}", other),
    }
    assert!(!driver.is_open(LOOP_DEVICE));
}

#[test]
fn test_open_missing_native_device_fails() {
    let result = SerialPort::open("/dev/nonexistent_port_12345", "baudrate=9600");
    assert!(matches!(result, Err(SerialError::Open { .. })));
}

#[test]
fn test_port_keeps_identification() {
    let (_driver, port) = open_loopback();
    assert_eq!(port.port_name(), LOOP_DEVICE);
    assert_eq!(port.options(), "baudrate=115200");
    assert!(port.is_open());
}

#[test]
fn test_close_twice_is_harmless() {
    let (driver, port) = open_loopback();

    port.close();
    port.close();

    assert!(!port.is_open());
    assert!(!driver.is_open(LOOP_DEVICE));

    // The device is free for a new owner.
    let reopened = SerialPort::open_with(driver.clone(), LOOP_DEVICE, "").unwrap();
    assert!(reopened.is_open());
}

#[test]
fn test_every_operation_fails_after_close() {
    let (driver, port) = open_loopback();
    port.close();
    let calls_before = driver.io_calls(LOOP_DEVICE);

    let mut buf = [0u8; 4];
    assert!(matches!(port.bytes_available(), Err(SerialError::Closed)));
    assert!(matches!(port.read_byte(), Err(SerialError::Closed)));
    assert!(matches!(port.read_into(&mut buf, 0, 4), Err(SerialError::Closed)));
    assert!(matches!(port.write_byte(7), Err(SerialError::Closed)));
    assert!(matches!(port.write_from(&buf, 0, 4), Err(SerialError::Closed)));
    assert!(matches!(port.flush(), Err(SerialError::Closed)));

    assert_eq!(driver.io_calls(LOOP_DEVICE), calls_before);
}

#[test]
fn test_drop_releases_device() {
    let (driver, port) = open_loopback();
    drop(port);
    assert!(!driver.is_open(LOOP_DEVICE));
}

#[test]
fn test_disconnect_surfaces_as_io_error() {
    let (driver, port) = open_loopback();
    driver.hang_up(LOOP_DEVICE);

    assert!(matches!(
        port.bytes_available(),
        Err(SerialError::Io(DriverError::Disconnected(_)))
    ));
    assert!(matches!(
        port.write_from(b"late", 0, 4),
        Err(SerialError::Io(DriverError::Disconnected(_)))
    ));
    assert_eq!(port.read_byte().unwrap(), None);
}

#[test]
fn test_io_failure_is_not_retried() {
    let (driver, port) = open_loopback();
    driver.fail_next_io(LOOP_DEVICE);

    assert!(matches!(
        port.write_from(b"abc", 0, 3),
        Err(SerialError::Io(DriverError::Io(_)))
    ));
    assert!(driver.transcript(LOOP_DEVICE).is_empty());

    port.write_from(b"abc", 0, 3).unwrap();
    assert_eq!(driver.transcript(LOOP_DEVICE), b"abc");
}
