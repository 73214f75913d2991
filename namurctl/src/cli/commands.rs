//! CLI command and subcommand definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// NAMUR heater-stirrer CLI
#[derive(Parser, Debug)]
#[command(name = "namurctl")]
#[command(version, about = "NAMUR heater-stirrer CLI", long_about = None)]
pub struct Cli {
    /// Serial device path (overrides config file and NAMUR_PORT)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Baud rate (overrides config file and NAMUR_BAUD)
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Per-command response window in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Config file path (default: ~/.config/namur/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List serial ports
    Ports,

    /// Read the device identity string
    Name,

    /// Read the measured stirring speed
    Speed,

    /// Read the commanded stirring speed
    SpeedSetpoint,

    /// Start stirring at the given speed
    StartStir {
        /// Speed in RPM (non-numeric values stop the motor)
        #[arg(allow_negative_numbers = true)]
        speed: String,

        /// Vessel identifier or JSON object with an "id" field
        #[arg(long, default_value = "")]
        vessel: String,

        /// Free-form purpose, logged only
        #[arg(long, default_value = "")]
        purpose: String,
    },

    /// Stop stirring
    StopStir {
        /// Vessel identifier or JSON object with an "id" field
        #[arg(long, default_value = "")]
        vessel: String,
    },

    /// Stir for a while, stop, then wait for the contents to settle
    Stir {
        /// Stirring time in seconds
        #[arg(short, long, default_value = "0")]
        time: String,

        /// Speed in RPM
        #[arg(short, long, allow_negative_numbers = true)]
        speed: String,

        /// Settling time in seconds
        #[arg(long, default_value = "0")]
        settle: String,
    },

    /// Set the temperature setpoint and start heating
    SetTemp {
        /// Temperature in degrees
        temp: f64,
    },

    /// Send raw NAMUR tokens and print the reply
    Raw {
        /// Command tokens (e.g. IN_PV_1)
        #[arg(required = true)]
        tokens: Vec<String>,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the resolved serial settings as TOML
    Show,

    /// Print the config file path
    Path,
}

