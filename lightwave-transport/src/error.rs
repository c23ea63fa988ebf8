//! Transport error types

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while encoding, building or transmitting
#[derive(Error, Debug)]
pub enum TransportError {
    // Codec errors
    #[error("Invalid buffer: {0}")]
    Validation(String),

    #[error("Cannot decode class {class} with parameter {param} (0x{param:02X})")]
    Decoding { class: u8, param: u8 },

    #[error("Cannot encode {action} with value {value}: {reason}")]
    Encoding {
        action: &'static str,
        value: u8,
        reason: &'static str,
    },

    // Waveform errors
    #[error("Pulse count exceeds maximum of {max}")]
    CapacityExceeded { max: usize },

    // Device errors
    #[error("Device error: {0}")]
    Device(String),

    #[error("Device permission denied: {0}")]
    PermissionDenied(String),

    #[error("GPIO pin {0} is already claimed by another transmitter")]
    PinBusy(u32),

    #[error("Transmission cancelled")]
    Cancelled,

    #[error("Transmission did not finish within {0:?}")]
    Timeout(Duration),

    // Generic
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TransportError {
    /// True for errors raised before any pulse reached the pin
    pub fn is_pre_transmission(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Decoding { .. }
                | Self::Encoding { .. }
                | Self::CapacityExceeded { .. }
                | Self::Config(_)
                | Self::PinBusy(_)
        )
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        let msg = e.to_string();
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            TransportError::PermissionDenied(msg)
        } else {
            TransportError::Device(msg)
        }
    }
}
