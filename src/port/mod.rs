//! Serial port handle and its stream views.
//!
//! [`SerialPort`] owns one device session and mediates all byte traffic
//! through it. [`InputStream`] and [`OutputStream`] adapt it to
//! `std::io::Read` / `std::io::Write`, and [`AsyncSerialPort`] moves the
//! blocking calls onto tokio's blocking pool.

pub mod async_port;
pub mod serial;
pub mod stream;

pub use async_port::AsyncSerialPort;
pub use serial::SerialPort;
pub use stream::{InputStream, OutputStream};
