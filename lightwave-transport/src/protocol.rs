//! Protocol constants and utilities for LightwaveRF transmission

use crate::error::TransportError;

/// Payload size of every LightwaveRF message
pub const BUFFER_SIZE: usize = 10;

/// Number of address bytes (buffer[4..9])
pub const ADDRESS_LEN: usize = 5;

/// Upper bound on pulses in one waveform (DMA wave engine limit)
pub const MAX_PULSES: usize = 1600;

/// Byte offsets inside the wire buffer
pub mod layout {
    pub const PARAM_HIGH: usize = 0;
    pub const PARAM_LOW: usize = 1;
    pub const DEVICE: usize = 2;
    pub const CLASS: usize = 3;
    pub const ADDRESS: usize = 4;
    pub const ROOM: usize = 9;
}

/// Command classes (buffer[3])
pub mod class {
    pub const OFF: u8 = 0;
    pub const ON: u8 = 1;
    pub const MOOD: u8 = 2;

    /// Get human-readable name for a command class byte
    pub fn name(class: u8) -> &'static str {
        match class {
            OFF => "off",
            ON => "on",
            MOOD => "mood",
            _ => "unknown",
        }
    }
}

/// Transmission timing, in ticks of one bit period
pub mod timing {
    /// Default tick length (us)
    pub const DEFAULT_PERIOD_US: u32 = 140;
    /// Default number of message repetitions
    pub const DEFAULT_REPEATS: u32 = 10;
    /// Default BCM pin driving the transmitter data line
    pub const DEFAULT_PIN: u32 = 22;

    /// Ticks in a high (1) bit: 560 us at the default period
    pub const HIGH_TICKS: u32 = 4;
    /// Ticks in a low (0) bit: 980 us at the default period
    pub const LOW_TICKS: u32 = 7;
    /// Counter value at which the line is forced low: 280 us trailer
    pub const TRAIL_TICKS: u32 = 2;
    /// Inter-message gap: 72 ticks (10.08 ms at 140 us)
    pub const GAP_TICKS: u32 = 72;
    /// Toggle counter value when a waveform starts
    pub const INITIAL_TOGGLE: u32 = 3;

    /// Waits shorter than this are spun rather than slept (us)
    pub const SPIN_THRESHOLD_US: u64 = 200;
}

/// Bit mask for a BCM pin number, as used in pulse on/off masks
#[inline]
pub fn pin_mask(pin: u32) -> Result<u32, TransportError> {
    if pin >= 32 {
        return Err(TransportError::Config(format!(
            "pin {pin} does not fit a 32-bit GPIO mask"
        )));
    }
    Ok(1u32 << pin)
}

/// Parse a hex string (whitespace, `0x` prefix and `:`/`-` separators allowed)
pub fn parse_hex(s: &str) -> Result<Vec<u8>, TransportError> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let digits: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();

    if let Some(c) = digits.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(TransportError::Validation(format!(
            "invalid hex character '{c}'"
        )));
    }
    if digits.len() % 2 != 0 {
        return Err(TransportError::Validation(format!(
            "hex string has odd length {}",
            digits.len()
        )));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| {
                TransportError::Validation(format!("invalid hex byte \"{}\"", &digits[i..i + 2]))
            })
        })
        .collect()
}

/// Format bytes as a lowercase hex string without separators
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
