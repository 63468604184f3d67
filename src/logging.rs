//! Tracing subscriber setup.
//!
//! Drivers emit `debug!` events for lifecycle changes and `trace!` events with
//! hex dumps of every transfer. What reaches the terminal is decided here:
//! `RUST_LOG` wins, then the configured level.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Errors from subscriber installation.
pub type LoggingError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the filter: `RUST_LOG` if set, else `level_override`, else the config level.
pub fn build_filter(
    config: &LoggingConfig,
    level_override: Option<&str>,
) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = level_override.unwrap_or(&config.level);
    Ok(EnvFilter::try_new(directive)?)
}

/// Install the global subscriber. Logs go to stderr so stdout stays free for
/// device data.
pub fn init(config: &LoggingConfig, level_override: Option<&str>) -> Result<(), LoggingError> {
    let filter = build_filter(config, level_override)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    }
}
