//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `transmit`: Commands that key the radio (send, command, batch)
//! - `codec`: Offline buffer work (encode, decode)
//! - `waveform`: Waveform inspection
//! - `utility`: Configuration display

pub mod codec;
pub mod transmit;
pub mod utility;
pub mod waveform;

use anyhow::Context;
use lightwave::LightwaveConfig;
use lightwave_transport::protocol::{self, ADDRESS_LEN};
use lightwave_transport::{
    open_backend, Action, CancelToken, Command, Printer, PrinterConfig, TransmitterHandle,
};

use crate::cli::{Cli, TargetArgs};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Apply command-line overrides on top of the loaded config
pub fn apply_overrides(config: &mut LightwaveConfig, cli: &Cli) {
    if let Some(backend) = cli.backend {
        config.backend = backend.into();
    }
    let tx = &mut config.transmitter;
    if let Some(pin) = cli.pin {
        tx.pin = pin;
    }
    if let Some(repeats) = cli.repeats {
        tx.repeats = repeats;
    }
    if let Some(period) = cli.period {
        tx.period_us = period;
    }
    if cli.no_translate {
        tx.translate = false;
    }
    if cli.invert {
        tx.invert = true;
    }
}

/// Create printer config from CLI flags
pub fn create_printer_config(monitor: bool) -> Option<PrinterConfig> {
    monitor.then(PrinterConfig::default)
}

/// Open the configured backend and take ownership of its pin.
/// If `printer_config` is Some, the backend is wrapped with Printer for monitoring.
pub fn open_handle(
    config: &LightwaveConfig,
    printer_config: Option<PrinterConfig>,
) -> anyhow::Result<TransmitterHandle> {
    let params = config.transmitter.clone();
    let backend = open_backend(config.backend, &params)
        .with_context(|| format!("opening {} backend on pin {}", config.backend, params.pin))?;
    let backend = match printer_config {
        Some(pc) => Printer::wrap(backend, pc),
        None => backend,
    };
    let handle = TransmitterHandle::acquire(backend, params)?;
    setup_interrupt_handler(handle.cancel_token());
    Ok(handle)
}

/// Set up a Ctrl-C handler that cancels the transmission in flight.
pub fn setup_interrupt_handler(token: CancelToken) {
    ctrlc::set_handler(move || {
        token.cancel();
    })
    .ok();
}

/// Build a command from CLI arguments
pub fn parse_command(action: &str, value: Option<u8>, target: &TargetArgs) -> anyhow::Result<Command> {
    let action = Action::parse(action, value)?;
    let bytes = protocol::parse_hex(&target.address)?;
    let address: [u8; ADDRESS_LEN] = bytes.as_slice().try_into().map_err(|_| {
        anyhow::anyhow!(
            "address must be {ADDRESS_LEN} bytes, got {}",
            bytes.len()
        )
    })?;
    Ok(Command::new(action, target.device, address, target.room))
}
