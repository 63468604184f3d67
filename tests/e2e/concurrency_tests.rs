//! Several threads sharing one port.

use crate::common::{frame, open_loopback, read_exactly, wait_until, LOOP_DEVICE};
use pretty_assertions::assert_eq;
use serial_driver::SerialError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const FRAME_LEN: usize = 512;

#[test]
fn test_concurrent_writes_stay_contiguous() {
    let (driver, port) = open_loopback();
    let port = Arc::new(port);
    let writers = 8u8;
    let rounds = 20;
    let barrier = Arc::new(Barrier::new(writers as usize));

    let handles: Vec<_> = (0..writers)
        .map(|tag| {
            let port = Arc::clone(&port);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let data = frame(b'A' + tag, FRAME_LEN);
                barrier.wait();
                for _ in 0..rounds {
                    port.write_from(&data, 0, data.len()).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let transcript = driver.transcript(LOOP_DEVICE);
    assert_eq!(transcript.len(), writers as usize * rounds * FRAME_LEN);
    for chunk in transcript.chunks(FRAME_LEN) {
        assert!(
            chunk.iter().all(|&b| b == chunk[0]),
            "frame interleaved with another writer"
        );
    }
}

#[test]
fn test_concurrent_readers_never_share_bytes() {
    let (driver, port) = open_loopback();
    let port = Arc::new(port);
    let total = 4096usize;
    let payload: Vec<u8> = (0..total).map(|i| (i % 251) as u8).collect();
    driver.inject(LOOP_DEVICE, &payload);
    // Readers drain the queue and then see end of stream instead of blocking.
    driver.hang_up(LOOP_DEVICE);

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let port = Arc::clone(&port);
            thread::spawn(move || {
                let mut got = Vec::new();
                let mut buf = [0u8; 64];
                loop {
                    match port.read_into(&mut buf, 0, 64).unwrap() {
                        0 => break,
                        n => got.extend_from_slice(&buf[..n]),
                    }
                }
                got
            })
        })
        .collect();

    let mut claimed: Vec<u8> = Vec::with_capacity(total);
    for reader in readers {
        claimed.extend(reader.join().unwrap());
    }

    let mut expected = payload;
    expected.sort_unstable();
    claimed.sort_unstable();
    assert_eq!(claimed, expected);
}

#[test]
fn test_read_and_write_proceed_together() {
    let (driver, port) = open_loopback();
    let port = Arc::new(port);
    let reader_started = Arc::new(AtomicBool::new(false));

    let reader = {
        let port = Arc::clone(&port);
        let started = Arc::clone(&reader_started);
        thread::spawn(move || {
            started.store(true, Ordering::SeqCst);
            read_exactly(&port, 5)
        })
    };

    assert!(wait_until(Duration::from_secs(2), || reader_started
        .load(Ordering::SeqCst)));
    thread::sleep(Duration::from_millis(20));

    // The blocked reader must not hold up the writer.
    port.write_from(b"hello", 0, 5).unwrap();
    assert_eq!(reader.join().unwrap(), b"hello");
    assert_eq!(driver.transcript(LOOP_DEVICE), b"hello");
}

#[test]
fn test_close_releases_blocked_reader() {
    let (driver, port) = open_loopback();
    let port = Arc::new(port);

    let reader = {
        let port = Arc::clone(&port);
        thread::spawn(move || port.read_byte())
    };

    assert!(wait_until(Duration::from_secs(2), || driver.io_calls(LOOP_DEVICE) > 0));
    port.close();

    let result = reader.join().unwrap();
    assert!(matches!(result, Err(SerialError::Closed)));
    assert!(!driver.is_open(LOOP_DEVICE));
}

#[test]
fn test_close_from_many_threads() {
    let (driver, port) = open_loopback();
    let port = Arc::new(port);
    let barrier = Arc::new(Barrier::new(6));

    let closers: Vec<_> = (0..6)
        .map(|_| {
            let port = Arc::clone(&port);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                port.close();
            })
        })
        .collect();
    for closer in closers {
        closer.join().unwrap();
    }

    assert!(!port.is_open());
    assert!(!driver.is_open(LOOP_DEVICE));
    assert!(matches!(port.write_byte(1), Err(SerialError::Closed)));
}
