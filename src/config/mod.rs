//! TOML configuration for the `serial-driver` binary and the hardware tests.
//!
//! The first file found wins:
//!
//! 1. the path in `SERIAL_DRIVER_CONFIG`
//! 2. `./serial-driver.toml`
//! 3. `serial-driver/config.toml` under `$XDG_CONFIG_HOME`, `~/.config` or `%APPDATA%`
//!
//! With no file the built-in defaults are used. Environment variables named
//! `SERIAL_DRIVER_<SECTION>_<KEY>` override individual values, e.g.
//! `SERIAL_DRIVER_SERIAL_OPTIONS=baudrate=9600;parity=even` or
//! `SERIAL_DRIVER_LOGGING_LEVEL=serial_driver=trace`. The `[testing]` section
//! also reads `TEST_PORT`, `TEST_OPTIONS` and `TEST_LOOPBACK`
//! (`LOOPBACK_ENABLED` is accepted too).
//!
//! ```toml
//! [serial]
//! port = "modem"
//! options = "baudrate=115200;autocts=off;autorts=off"
//!
//! [serial.port_aliases]
//! modem = "/dev/ttyACM0"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, resolve_config_path, ConfigLoader, CONFIG_PATH_VAR};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig, TestingConfig};
