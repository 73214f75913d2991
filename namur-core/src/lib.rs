//! NAMUR Core Library
//!
//! Shared types, command vocabulary and configuration for driving laboratory
//! heater-stirrers over the NAMUR serial protocol. The serial transport and
//! the device facade live in `namur-hardware`.

pub mod command;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use command::{decode_response, frame_command, Command, LINE_TERMINATOR};
pub use config::{default_config_path, NamurConfig, SerialSettings};
pub use error::*;
pub use types::*;
