//! End-to-end tests for the serial driver.
//!
//! These tests run against the public API without requiring real hardware.
//! They use the loopback driver to stand in for a device and cover the
//! complete lifecycle from open through traffic to close.

pub mod concurrency_tests;
pub mod lifecycle_tests;
pub mod roundtrip_tests;
