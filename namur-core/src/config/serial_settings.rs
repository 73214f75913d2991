//! Serial session settings loaded once at construction
//!
//! There is no runtime reconfiguration: a client keeps the settings it was
//! built with for its whole lifetime.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::{NamurError, Result};

/// Default baud rate of the NAMUR RS-232 interface
pub const DEFAULT_BAUD_RATE: u32 = 9600;

fn default_port() -> String {
    if cfg!(windows) {
        "COM7".to_string()
    } else {
        "/dev/ttyUSB0".to_string()
    }
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_write_timeout_ms() -> u64 {
    2000
}

fn default_open_settle_ms() -> u64 {
    100
}

fn default_response_settle_ms() -> u64 {
    250
}

fn default_poll_interval_ms() -> u64 {
    20
}

/// Serial connection and exchange timing
///
/// Framing is always 7 data bits, even parity, 1 stop bit and is not
/// configurable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Serial device path (e.g. "/dev/ttyUSB0" or "COM7")
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read-until-quiet window per exchange, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Port-level write timeout, in milliseconds
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Delay after opening the port before first use
    #[serde(default = "default_open_settle_ms")]
    pub open_settle_ms: u64,
    /// Delay between writing a command and starting to read
    #[serde(default = "default_response_settle_ms")]
    pub response_settle_ms: u64,
    /// Sleep between polls while no bytes are available
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            open_settle_ms: default_open_settle_ms(),
            response_settle_ms: default_response_settle_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl SerialSettings {
    /// Default settings for the given port
    pub fn for_port(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms)
    }

    pub fn response_settle(&self) -> Duration {
        Duration::from_millis(self.response_settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Reject settings the serial layer cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(NamurError::Config("Serial port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(NamurError::Config("Baud rate must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Configuration file contents
///
/// Located at `~/.config/namur/config.toml` by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamurConfig {
    /// Serial settings for the device
    #[serde(default)]
    pub serial: SerialSettings,
}

impl NamurConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.serial.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| NamurError::Config(e.to_string()))
    }

    /// Load configuration from a file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            NamurError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }
}
