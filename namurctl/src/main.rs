//! NAMUR CLI
//!
//! Command-line interface for driving a NAMUR heater-stirrer over a serial port.

use anyhow::Result;
use clap::Parser;
use namur_hardware::HeaterStirrer;
use namurctl::cli::{generate_completion, handle_config, handle_device, handle_ports, Cli, Commands};
use namurctl::config::{resolve_config_path, SettingsBuilder};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config_path = resolve_config_path(cli.config.clone());
    debug!("Configuration file: {}", config_path.display());

    // Build settings using priority chain: defaults → file → env → CLI args
    let settings = SettingsBuilder::new()
        .with_config_file(&config_path)?
        .with_env_overrides()?
        .with_port(cli.port.clone())
        .with_baud_rate(cli.baud)
        .with_timeout_ms(cli.timeout_ms)
        .build()?;

    let result = match cli.command {
        Commands::Ports => handle_ports(),
        Commands::Config { command } => handle_config(command, &settings, &config_path),
        Commands::Completion { shell } => {
            generate_completion(shell);
            Ok(())
        }
        command => match HeaterStirrer::connect(settings).await {
            Ok(mut stirrer) => handle_device(&mut stirrer, command).await,
            Err(e) => Err(e.into()),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
