//! Startup configuration
//!
//! A single JSON document read once at startup. Every section and field is
//! optional; missing values fall back to the defaults below. Paths default to
//! the rider's home directory:
//!
//! | setting | default |
//! |---|---|
//! | video FIFO | `~/bob/fifo_to_video` |
//! | sensor FIFO | `~/bob/fifo_to_can` |
//! | catalog | `~/ffs/config/catalog.json` |
//! | dictionary | `~/ffs/config/policanbent.json` |

mod error;

pub use error::ConfigError;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bus::DEFAULT_TRANSMIT_TIMEOUT_MS;
use crate::overlay::OverlayConfig;
use crate::reconnect::ReconnectPolicy;

/// Default maximum line length accepted from a FIFO
pub const DEFAULT_MAX_LINE_LENGTH: usize = 4096;

/// File locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// FIFO the relay writes telemetry lines to and the overlay reads
    pub video_fifo: PathBuf,
    /// FIFO auxiliary sensors write readings to
    pub sensor_fifo: PathBuf,
    /// Signal catalog JSON
    pub catalog: PathBuf,
    /// Message dictionary JSON
    pub dictionary: PathBuf,
    /// File the overlay publishes rendered frames to
    pub frame_output: PathBuf,
}

impl PathsConfig {
    /// Defaults rooted at `home`
    pub fn rooted_at(home: &Path) -> Self {
        let bob = home.join("bob");
        let config = home.join("ffs").join("config");
        Self {
            video_fifo: bob.join("fifo_to_video"),
            sensor_fifo: bob.join("fifo_to_can"),
            catalog: config.join("catalog.json"),
            dictionary: config.join("policanbent.json"),
            frame_output: bob.join("overlay.rgba"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        // Relative paths are resolved against the working directory when no
        // home directory exists
        let home = dirs::home_dir().unwrap_or_default();
        Self::rooted_at(&home)
    }
}

/// Bus connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// SocketCAN interface name
    pub interface: String,
    /// Upper bound for a single transmit
    pub transmit_timeout_ms: u64,
    /// Backoff for reopening the bus
    pub reconnect: ReconnectPolicy,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            interface: "can0".to_string(),
            transmit_timeout_ms: DEFAULT_TRANSMIT_TIMEOUT_MS,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// FIFO transport settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Backoff for reopening a FIFO
    pub reconnect: ReconnectPolicy,
    /// Longer lines are discarded
    pub max_line_length: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

/// Complete daemon configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// File locations
    pub paths: PathsConfig,
    /// Bus settings
    pub bus: BusConfig,
    /// FIFO settings
    pub transport: TransportConfig,
    /// Overlay geometry and styling
    pub overlay: OverlayConfig,
}

impl AppConfig {
    /// Parse a configuration document
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|source| ConfigError::ParseError {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise use defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Default configuration file location, `~/ffs/config/cyclehud.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join("ffs").join("config").join("cyclehud.json"))
    }

    /// Reject settings no component can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.interface.trim().is_empty() {
            return Err(invalid("bus.interface", "must not be empty"));
        }
        if self.bus.transmit_timeout_ms == 0 {
            return Err(invalid("bus.transmit_timeout_ms", "must be positive"));
        }
        if self.transport.max_line_length == 0 {
            return Err(invalid("transport.max_line_length", "must be positive"));
        }
        for (field, policy) in [
            ("bus.reconnect", &self.bus.reconnect),
            ("transport.reconnect", &self.transport.reconnect),
        ] {
            if policy.initial_delay_ms == 0 || policy.max_delay_ms < policy.initial_delay_ms {
                return Err(invalid(
                    field,
                    "initial_delay_ms must be positive and not above max_delay_ms",
                ));
            }
        }
        self.overlay
            .validate()
            .map_err(|message| invalid("overlay", &message))
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}
