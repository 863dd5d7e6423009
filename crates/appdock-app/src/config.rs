//! Settings loading from the user config file
//!
//! Settings live in `<config dir>/appdock/config.toml`. A missing default
//! file yields the built-in defaults; an explicitly requested file must
//! exist. Unknown keys are ignored so newer files keep working with older
//! binaries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use appdock_core::prelude::*;

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "appdock";

/// Bare executable name resolved on PATH when no path is configured
pub const DEFAULT_INSTALLER_BIN: &str = "ideviceinstaller";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Client label presented to the device during the session handshake
pub const DEFAULT_CLIENT_LABEL: &str = "appdock";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Installer executable: a bare name (PATH lookup) or a full path
    pub installer_path: PathBuf,

    /// Presence polling cadence in milliseconds
    pub poll_interval_ms: u64,

    /// Client label used in the session handshake
    pub client_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            installer_path: PathBuf::from(DEFAULT_INSTALLER_BIN),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            client_label: DEFAULT_CLIENT_LABEL.to_string(),
        }
    }
}

impl Settings {
    /// Default config file location: `<config dir>/appdock/config.toml`
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join(APP_DIR).join(CONFIG_FILENAME)
    }

    /// Load settings from `path`, or from the default location when `None`.
    ///
    /// The default file may be absent (built-in defaults apply); an explicit
    /// path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_config_path(), false),
        };

        if !path.exists() {
            if required {
                return Err(Error::config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        let settings = Self::from_toml_str(&raw)?;
        settings.validate()?;
        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let settings: Settings =
            toml::from_str(raw).map_err(|e| Error::config_invalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::config_invalid(
                "poll_interval_ms must be greater than zero",
            ));
        }
        if self.client_label.is_empty() {
            return Err(Error::config_invalid("client_label must not be empty"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve the installer executable for spawning.
    ///
    /// Bare names are looked up on PATH; anything with a path separator is
    /// used verbatim. A failed lookup keeps the bare name so the failure
    /// surfaces at launch time as the launch-failed condition, not here.
    pub fn resolved_installer(&self) -> PathBuf {
        if self.installer_path.components().count() == 1 {
            which::which(&self.installer_path).unwrap_or_else(|_| self.installer_path.clone())
        } else {
            self.installer_path.clone()
        }
    }
}
