//! Byte traffic through a loopback device.

use crate::common::{open_loopback, open_loopback_without_flush, read_exactly, LOOP_DEVICE};
use pretty_assertions::assert_eq;
use serial_driver::SerialError;
use std::io::{Read, Write};

#[test]
fn test_write_from_then_read_back() {
    let (_driver, port) = open_loopback();
    let payload: Vec<u8> = (0..=255u8).collect();

    port.write_from(&payload, 0, payload.len()).unwrap();
    assert_eq!(port.bytes_available().unwrap(), 256);

    assert_eq!(read_exactly(&port, 256), payload);
    assert_eq!(port.bytes_available().unwrap(), 0);
}

#[test]
fn test_write_from_honours_offset_and_length() {
    let (driver, port) = open_loopback();

    port.write_from(b"xxHELLOxx", 2, 5).unwrap();
    assert_eq!(driver.transcript(LOOP_DEVICE), b"HELLO");

    let mut buf = [b'-'; 9];
    let n = port.read_into(&mut buf, 3, 5).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf, b"---HELLO-");
}

#[test]
fn test_short_read_returns_what_is_there() {
    let (driver, port) = open_loopback();
    driver.inject(LOOP_DEVICE, b"abc");

    let mut buf = [0u8; 16];
    let n = port.read_into(&mut buf, 0, 16).unwrap();
    assert_eq!(n, 3);
    assert_eq!(&buf[..n], b"abc");
}

#[test]
fn test_single_byte_operations() {
    let (_driver, port) = open_loopback();

    for byte in [0x00, 0x7F, 0x80, 0xFF] {
        port.write_byte(byte).unwrap();
    }
    let read: Vec<u8> = (0..4).map(|_| port.read_byte().unwrap().unwrap()).collect();
    assert_eq!(read, vec![0x00, 0x7F, 0x80, 0xFF]);
}

#[test]
fn test_end_of_stream_markers() {
    let (driver, port) = open_loopback();
    driver.hang_up(LOOP_DEVICE);

    let mut buf = [0u8; 8];
    assert_eq!(port.read_into(&mut buf, 0, 8).unwrap(), 0);
    assert_eq!(port.read_byte().unwrap(), None);
}

#[test]
fn test_zero_length_calls_do_no_device_io() {
    let (driver, port) = open_loopback();
    let mut buf = [0u8; 8];

    assert_eq!(port.read_into(&mut buf, 8, 0).unwrap(), 0);
    port.write_from(&buf, 0, 0).unwrap();

    assert_eq!(driver.io_calls(LOOP_DEVICE), 0);
}

#[test]
fn test_out_of_bounds_does_no_device_io() {
    let (driver, port) = open_loopback();
    let mut buf = [0u8; 8];

    assert!(matches!(
        port.read_into(&mut buf, 6, 3),
        Err(SerialError::OutOfBounds {
            offset: 6,
            len: 3,
            capacity: 8
        })
    ));
    assert!(matches!(
        port.write_from(&buf, 9, 0),
        Err(SerialError::OutOfBounds { .. })
    ));

    assert_eq!(driver.io_calls(LOOP_DEVICE), 0);
    assert!(driver.transcript(LOOP_DEVICE).is_empty());
}

#[test]
fn test_flush_reaches_capable_driver() {
    let (driver, port) = open_loopback();
    assert!(port.supports_flush());

    port.write_from(b"data", 0, 4).unwrap();
    port.flush().unwrap();
    assert_eq!(driver.flush_count(LOOP_DEVICE), 1);
}

#[test]
fn test_flush_is_noop_without_capability() {
    let (driver, port) = open_loopback_without_flush();
    assert!(!port.supports_flush());

    port.flush().unwrap();
    assert_eq!(driver.flush_count(LOOP_DEVICE), 0);
}

#[test]
fn test_std_io_adapters() {
    let (_driver, port) = open_loopback();

    write!(port.output(), "value={}\r\n", 42).unwrap();
    port.output().flush().unwrap();

    let mut text = [0u8; 10];
    port.input().read_exact(&mut text).unwrap();
    assert_eq!(&text, b"value=42\r\n");
}
