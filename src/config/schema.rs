//! Shape of `serial-driver.toml`. Every section and field is optional.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub logging: LoggingConfig,
    pub testing: TestingConfig,
}

/// `[serial]`: what the CLI opens when no arguments say otherwise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: Option<String>,
    /// Handed to the driver as-is.
    pub options: String,
    /// Short names for device paths, e.g. `modem = "/dev/ttyACM0"`.
    pub port_aliases: HashMap<String, String>,
}

impl SerialConfig {
    /// Map an alias to its device path. Unknown names pass through.
    pub fn resolve_port(&self, name: &str) -> String {
        match self.port_aliases.get(name) {
            Some(path) => path.clone(),
            None => name.to_string(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// An `EnvFilter` directive: a bare level or `target=level,...`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event.
    Json,
    /// Multi-line, colored.
    #[default]
    Pretty,
    /// Single line per event.
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else if s.eq_ignore_ascii_case("pretty") {
            Ok(Self::Pretty)
        } else if s.eq_ignore_ascii_case("compact") {
            Ok(Self::Compact)
        } else {
            Err(format!("expected json, pretty or compact, got '{s}'"))
        }
    }
}

/// `[testing]`: the device the ignored hardware tests run against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    pub port: Option<String>,
    pub options: String,
    /// TX is wired back to RX.
    pub loopback_enabled: bool,
}
