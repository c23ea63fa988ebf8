//! Waveform inspection

use lightwave::LightwaveConfig;
use lightwave_transport::printer;
use lightwave_transport::{Buffer, OutputFormat, PrinterConfig, WaveformBuilder};

use super::CommandResult;

/// Build the waveform for `hex` with the configured parameters and print it
pub fn waveform(config: &LightwaveConfig, hex: &str, pulses: bool, json: bool) -> CommandResult {
    let buffer = Buffer::from_hex(hex)?;
    let builder = WaveformBuilder::new(config.transmitter.clone())?;
    let wave = builder.build(&buffer)?;

    let format = if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    let printer_config = PrinterConfig::default()
        .with_pulses(pulses)
        .with_format(format);

    if !json {
        println!("{}  {}", buffer, buffer.describe());
    }
    println!("{}", printer::render(&wave, &printer_config)?);
    Ok(())
}
