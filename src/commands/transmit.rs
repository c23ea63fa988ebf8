//! Transmit commands: send, command, batch

use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use crossterm::style::Stylize;
use lightwave::{ControlService, LightwaveConfig};
use lightwave_transport::{Buffer, PrinterConfig, TxReport};
use tracing::warn;

use super::{open_handle, parse_command, CommandResult};
use crate::cli::TargetArgs;

fn print_report(report: &TxReport) {
    println!(
        "{} {}  {}",
        "Sent".green().bold(),
        report.buffer,
        report.buffer.describe()
    );
    println!(
        "  {} pulses, {:.3} ms on air, {:.3} ms elapsed",
        report.pulses,
        report.duration_us as f64 / 1000.0,
        report.elapsed.as_secs_f64() * 1000.0
    );
}

/// Transmit a raw buffer
pub fn send(config: &LightwaveConfig, printer: Option<PrinterConfig>, hex: &str) -> CommandResult {
    let buffer = Buffer::from_hex(hex)?;
    let handle = open_handle(config, printer)?;
    let report = handle.send_buffer(&buffer)?;
    print_report(&report);
    Ok(())
}

/// Encode and transmit a command
pub fn command(
    config: &LightwaveConfig,
    printer: Option<PrinterConfig>,
    action: &str,
    value: Option<u8>,
    target: &TargetArgs,
) -> CommandResult {
    let cmd = parse_command(action, value, target)?;
    let handle = open_handle(config, printer)?;
    let report = handle.send_command(&cmd)?;
    print_report(&report);
    Ok(())
}

/// Run every line of `file` (or stdin) through the control service
///
/// Blank lines and `#` comments are skipped. Failed requests are reported
/// and do not stop the batch.
pub fn batch(
    config: &LightwaveConfig,
    printer: Option<PrinterConfig>,
    file: Option<&PathBuf>,
) -> CommandResult {
    let reader: Box<dyn BufRead> = match file {
        Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let handle = open_handle(config, printer)?;
    let service = ControlService::new(handle, config.history_limit);
    let mut failures = 0usize;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        let request = line.trim();
        if request.is_empty() || request.starts_with('#') {
            continue;
        }

        let result = if request.starts_with('{') {
            service.send_json(request)
        } else {
            service.send_hex(request)
        };

        match result {
            Ok(record) => eprintln!(
                "{} #{}  {}",
                "OK".green(),
                record.sequence,
                record.command
            ),
            Err(e) => {
                failures += 1;
                warn!(line = lineno + 1, "Request failed: {e}");
                eprintln!("{} line {}: {}", "ERR".red(), lineno + 1, e);
                if service.handle().cancel_token().is_cancelled() {
                    break;
                }
            }
        }
    }

    println!("{}", service.history_json()?);
    if failures > 0 {
        anyhow::bail!("{failures} request(s) failed");
    }
    Ok(())
}
