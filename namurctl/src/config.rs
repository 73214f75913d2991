//! Serial settings resolution for the CLI
//!
//! Priority chain (lowest to highest):
//! 1. Defaults
//! 2. Config file
//! 3. Environment variables (`NAMUR_PORT`, `NAMUR_BAUD`)
//! 4. CLI arguments

use anyhow::{Context, Result};
use namur_core::{default_config_path, NamurConfig, SerialSettings};
use std::path::{Path, PathBuf};

/// Environment variable overriding the serial port
pub const ENV_PORT: &str = "NAMUR_PORT";
/// Environment variable overriding the baud rate
pub const ENV_BAUD: &str = "NAMUR_BAUD";
/// Environment variable overriding the config file location
pub const ENV_CONFIG: &str = "NAMUR_CONFIG";

/// Determine config path: CLI flag > env var > default
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| {
        std::env::var(ENV_CONFIG)
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    })
}

/// Builder applying each configuration layer over the previous one
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    settings: SerialSettings,
}

impl SettingsBuilder {
    /// Start from default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the settings with those of a config file (defaults if it does not exist)
    pub fn with_config_file(mut self, path: &Path) -> Result<Self> {
        let config = NamurConfig::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?;
        self.settings = config.serial;
        Ok(self)
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_env_lookup(|key| std::env::var(key).ok())
    }

    fn with_env_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(port) = lookup(ENV_PORT) {
            self.settings.port = port;
        }

        if let Some(baud) = lookup(ENV_BAUD) {
            self.settings.baud_rate = baud
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {:?}", ENV_BAUD, baud))?;
        }

        Ok(self)
    }

    /// Override the serial port
    pub fn with_port(mut self, port: Option<String>) -> Self {
        if let Some(port) = port {
            self.settings.port = port;
        }
        self
    }

    /// Override the baud rate
    pub fn with_baud_rate(mut self, baud_rate: Option<u32>) -> Self {
        if let Some(baud_rate) = baud_rate {
            self.settings.baud_rate = baud_rate;
        }
        self
    }

    /// Override the per-call response timeout
    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        if let Some(timeout_ms) = timeout_ms {
            self.settings.timeout_ms = timeout_ms;
        }
        self
    }

    /// Build final settings with validation
    pub fn build(self) -> Result<SerialSettings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
