//! Locating, reading and overriding the configuration file.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "SERIAL_DRIVER_CONFIG";

/// File looked for in the working directory.
const LOCAL_FILE: &str = "serial-driver.toml";

/// Directory and file name under the per-user config root.
const APP_DIR: &str = "serial-driver";
const USER_FILE: &str = "config.toml";

/// A loaded [`Config`] and the file it came from, if any.
///
/// # Example
/// ```no_run
/// use serial_driver::config::ConfigLoader;
///
/// let mut loader = ConfigLoader::load()?;
/// loader.config_mut().serial.options = "baudrate=9600".into();
/// loader.save()?;
/// # Ok::<(), serial_driver::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    config: Config,
}

impl ConfigLoader {
    /// Load from the first file found by [`resolve_config_path`], or start
    /// from defaults when there is none. Environment overrides apply either way.
    pub fn load() -> ConfigResult<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(path),
            None => {
                let mut config = Config::default();
                apply_env_overrides(&mut config)?;
                Ok(Self { path: None, config })
            }
        }
    }

    /// Load a specific file. A missing file is an error here.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let config = read_with_overrides(&path)?;
        debug!(path = %path.display(), "configuration loaded");
        Ok(Self {
            path: Some(path),
            config,
        })
    }

    /// Defaults plus environment overrides. Bad override values are ignored.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        if let Err(e) = apply_env_overrides(&mut config) {
            debug!("ignoring environment override: {e}");
        }
        Self { path: None, config }
    }

    /// File the configuration was read from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Write the configuration back to the file it came from.
    pub fn save(&self) -> ConfigResult<()> {
        let path = self.path.as_deref().ok_or(ConfigError::NoPath)?;
        write_file(&self.config, path)
    }

    /// Write the configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        write_file(&self.config, path.as_ref())
    }

    /// Re-read the backing file. Does nothing for a loader without one.
    pub fn reload(&mut self) -> ConfigResult<()> {
        if let Some(path) = &self.path {
            self.config = read_with_overrides(path)?;
        }
        Ok(())
    }
}

/// First existing file among `$SERIAL_DRIVER_CONFIG`, `./serial-driver.toml`
/// and [`default_config_path`].
pub fn resolve_config_path() -> Option<PathBuf> {
    let explicit = env::var_os(CONFIG_PATH_VAR).map(PathBuf::from);
    let local = Some(PathBuf::from(LOCAL_FILE));

    [explicit, local, default_config_path()]
        .into_iter()
        .flatten()
        .find(|candidate| candidate.is_file())
}

/// Per-user config file: `$XDG_CONFIG_HOME` or `~/.config` on Unix,
/// `%APPDATA%` on Windows, then `serial-driver/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    user_config_root().map(|root| root.join(APP_DIR).join(USER_FILE))
}

#[cfg(windows)]
fn user_config_root() -> Option<PathBuf> {
    env::var_os("APPDATA").map(PathBuf::from)
}

#[cfg(not(windows))]
fn user_config_root() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

fn read_with_overrides(path: &Path) -> ConfigResult<Config> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

fn write_file(config: &Config, path: &Path) -> ConfigResult<()> {
    let write_error = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(write_error)?;
    }
    let text = toml::to_string_pretty(config)?;
    std::fs::write(path, text).map_err(write_error)
}

/// Value of the first variable in `names` that is set.
fn first_var(names: &[&'static str]) -> Option<(&'static str, String)> {
    names
        .iter()
        .find_map(|&name| env::var(name).ok().map(|value| (name, value)))
}

/// Apply `SERIAL_DRIVER_<SECTION>_<KEY>` overrides. The `[testing]` keys also
/// accept the shorter `TEST_PORT`, `TEST_OPTIONS` and `TEST_LOOPBACK` names.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let Some((_, port)) = first_var(&["SERIAL_DRIVER_SERIAL_PORT"]) {
        config.serial.port = Some(port);
    }
    if let Some((_, options)) = first_var(&["SERIAL_DRIVER_SERIAL_OPTIONS"]) {
        config.serial.options = options;
    }

    if let Some((_, level)) = first_var(&["SERIAL_DRIVER_LOGGING_LEVEL"]) {
        config.logging.level = level;
    }
    if let Some((var, value)) = first_var(&["SERIAL_DRIVER_LOGGING_FORMAT"]) {
        config.logging.format = match value.parse() {
            Ok(format) => format,
            Err(reason) => {
                return Err(ConfigError::InvalidEnv {
                    var: var.into(),
                    value,
                    reason,
                })
            }
        };
    }

    if let Some((_, port)) = first_var(&["SERIAL_DRIVER_TESTING_PORT", "TEST_PORT"]) {
        config.testing.port = Some(port);
    }
    if let Some((_, options)) = first_var(&["SERIAL_DRIVER_TESTING_OPTIONS", "TEST_OPTIONS"]) {
        config.testing.options = options;
    }
    if let Some((var, value)) = first_var(&[
        "SERIAL_DRIVER_TESTING_LOOPBACK",
        "TEST_LOOPBACK",
        "LOOPBACK_ENABLED",
    ]) {
        config.testing.loopback_enabled = match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => true,
            "0" | "false" | "off" | "no" | "" => false,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    var: var.into(),
                    value,
                    reason: "expected a boolean".into(),
                })
            }
        };
    }

    Ok(())
}
