//! LightwaveRF transmitter CLI
//!
//! A command-line interface for sending LightwaveRF commands through a
//! 433 MHz OOK transmitter.

use anyhow::Result;
use clap::Parser;
use lightwave::LightwaveConfig;
use tracing::debug;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Load config
    let config_path = cli.config.clone().unwrap_or_else(LightwaveConfig::default_path);
    debug!("Loading config from {:?}", config_path);
    let mut config = LightwaveConfig::load(&config_path)?;
    commands::apply_overrides(&mut config, &cli);
    config.validate()?;

    // Create printer config if monitoring is enabled
    let printer_config = commands::create_printer_config(cli.monitor);

    match &cli.command {
        // === Transmit Commands ===
        Commands::Send { hex } => {
            commands::transmit::send(&config, printer_config, hex)?;
        }
        Commands::Command {
            action,
            value,
            target,
        } => {
            commands::transmit::command(&config, printer_config, action, *value, target)?;
        }
        Commands::Batch { file } => {
            commands::transmit::batch(&config, printer_config, file.as_ref())?;
        }

        // === Codec Commands ===
        Commands::Encode {
            action,
            value,
            target,
        } => {
            commands::codec::encode(action, *value, target)?;
        }
        Commands::Decode { hex } => {
            commands::codec::decode(hex)?;
        }
        Commands::Waveform { hex, pulses, json } => {
            commands::waveform::waveform(&config, hex, *pulses, *json)?;
        }

        // === Utility Commands ===
        Commands::Config { save } => {
            commands::utility::config(&config, &config_path, *save)?;
        }
    }

    Ok(())
}
