//! Configuration types for the NAMUR driver
//!
//! A single TOML file holds the serial settings for one device. Every field
//! has a default, so an empty or missing file is valid.

mod paths;
mod serial_settings;

pub use paths::default_config_path;
pub use serial_settings::{NamurConfig, SerialSettings};
