//! Command execution handlers

use anyhow::Result;
use colored::Colorize;
use namur_core::{DeviceStatus, NamurConfig, SerialSettings, StirParams, VesselRef};
use namur_hardware::{list_ports, HeaterStirrer};
use serde_json::Value;
use std::path::Path;

use super::commands::*;

/// Format a success message
pub fn format_success(message: &str) -> String {
    format!("{} {}", "✓".green().bold(), message)
}

/// Colorize a device status
pub fn format_status(status: DeviceStatus) -> String {
    match status {
        DeviceStatus::Idle => status.as_str().yellow().to_string(),
        DeviceStatus::Running => status.as_str().green().to_string(),
    }
}

/// Interpret a `--vessel` argument: a JSON object, or a plain identifier
pub fn parse_vessel(arg: &str) -> VesselRef {
    match serde_json::from_str::<Value>(arg) {
        Ok(value @ Value::Object(_)) => VesselRef::from(value),
        _ => VesselRef::from(arg),
    }
}

fn print_reply(reply: &str) {
    if reply.is_empty() {
        println!("{}", "(no reply)".dimmed());
    } else {
        println!("{}", reply);
    }
}

/// Handle ports command
pub fn handle_ports() -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for port in ports {
        match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => println!(
                "{:<20} USB {:04X}:{:04X} {}",
                port.name,
                vid,
                pid,
                port.product.unwrap_or_default()
            ),
            _ => println!("{}", port.name),
        }
    }

    Ok(())
}

/// Handle config commands
pub fn handle_config(
    command: ConfigCommands,
    settings: &SerialSettings,
    config_path: &Path,
) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = NamurConfig {
                serial: settings.clone(),
            };
            print!("{}", config.to_toml()?);
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
        }
    }
    Ok(())
}

/// Handle commands that talk to the device
pub async fn handle_device(stirrer: &mut HeaterStirrer, command: Commands) -> Result<()> {
    match command {
        Commands::Name => print_reply(&stirrer.read_name().await?),
        Commands::Speed => print_reply(&stirrer.read_speed().await?),
        Commands::SpeedSetpoint => print_reply(&stirrer.read_speed_setpoint().await?),
        Commands::StartStir {
            speed,
            vessel,
            purpose,
        } => {
            stirrer
                .start_stir(&parse_vessel(&vessel), &Value::String(speed), &purpose)
                .await?;
            println!(
                "{}",
                format_success(&format!(
                    "Stirring at {} rpm ({})",
                    stirrer.stir_speed(),
                    format_status(stirrer.status())
                ))
            );
        }
        Commands::StopStir { vessel } => {
            stirrer.stop_stir(&parse_vessel(&vessel)).await?;
            println!(
                "{}",
                format_success(&format!("Stopped ({})", format_status(stirrer.status())))
            );
        }
        Commands::Stir {
            time,
            speed,
            settle,
        } => {
            let params = StirParams::new(time, speed, settle);
            println!(
                "Stirring at {} rpm for {}s, settling {}s",
                params.speed_rpm(),
                params.stir_seconds(),
                params.settle_seconds()
            );
            stirrer.stir(&params).await?;
            println!("{}", format_success("Stir sequence complete"));
        }
        Commands::SetTemp { temp } => {
            stirrer.set_temp_target(temp).await?;
            println!(
                "{}",
                format_success(&format!("Heating to {}", stirrer.temp_target()))
            );
        }
        Commands::Raw { tokens } => print_reply(&stirrer.send(tokens).await?),
        Commands::Ports | Commands::Config { .. } | Commands::Completion { .. } => {
            anyhow::bail!("Command does not use the device")
        }
    }

    stirrer.close().await?;
    Ok(())
}

/// Generate shell completion script
pub fn generate_completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
