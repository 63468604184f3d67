//! Errors raised while loading, overriding or saving configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration failures. File errors carry the path involved.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("cannot write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An override variable was set to something unusable.
    #[error("{var}={value:?}: {reason}")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },

    /// `save` was called on a loader that was never tied to a file.
    #[error("no config file to save to")]
    NoPath,
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
