//! Codec commands: encode, decode

use crossterm::style::Stylize;
use lightwave_transport::nibble;
use lightwave_transport::protocol::class;
use lightwave_transport::Buffer;

use super::{parse_command, CommandResult};
use crate::cli::TargetArgs;

/// Print the wire buffer for a command
pub fn encode(action: &str, value: Option<u8>, target: &TargetArgs) -> CommandResult {
    let cmd = parse_command(action, value, target)?;
    let buffer = cmd.encode()?;
    println!("{}", buffer);
    println!("  {}  {}", "Command:".dim(), cmd);
    println!("  {}  {}", "Param:  ".dim(), buffer.parameter());
    println!("  {}  {}", "Class:  ".dim(), class::name(buffer.class()));
    Ok(())
}

/// Decode a hex buffer and show what goes on air
pub fn decode(hex: &str) -> CommandResult {
    let buffer = Buffer::from_hex(hex)?;
    println!("Buffer:     {}", buffer);
    println!(
        "Parameter:  {} (0x{:02X})",
        buffer.parameter(),
        buffer.parameter()
    );
    println!(
        "Class:      {} ({})",
        buffer.class(),
        class::name(buffer.class())
    );
    println!("Device:     {}", buffer.device());
    println!("Address:    {:?}", buffer.address());
    println!("Room:       {}", buffer.room());

    let coded = nibble::output_bytes(&buffer, true);
    println!("Line codes: {:02X?}", coded);

    match buffer.decode() {
        Ok(cmd) => println!("Command:    {}", cmd.to_string().green()),
        Err(e) => {
            println!("Command:    {}", "undecodable".red());
            return Err(e.into());
        }
    }
    Ok(())
}
