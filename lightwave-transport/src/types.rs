//! Common types for the transmitter layer

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Transmitter backend identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// No GPIO access; waveforms are logged and recorded
    #[default]
    Null,
    /// Linux sysfs GPIO (`/sys/class/gpio`)
    Sysfs,
}

impl BackendKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Sysfs => "sysfs",
        }
    }

    /// Check if this backend drives a real pin
    pub fn is_hardware(&self) -> bool {
        matches!(self, Self::Sysfs)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "null" | "none" | "dry-run" => Ok(Self::Null),
            "sysfs" | "gpio" => Ok(Self::Sysfs),
            _ => Err(TransportError::Config(format!("unknown backend \"{s}\""))),
        }
    }
}

/// Transmitter identification information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransmitterInfo {
    /// Backend type
    pub kind: BackendKind,
    /// BCM pin number
    pub pin: u32,
    /// Device path or identifier (backend-specific)
    pub device_path: String,
}

/// Cooperative cancellation flag shared between a sender and its controller
///
/// Cloning yields another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm after a cancelled transmission
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// `Err(Cancelled)` once the flag is set
    pub fn check(&self) -> Result<(), TransportError> {
        if self.is_cancelled() {
            Err(TransportError::Cancelled)
        } else {
            Ok(())
        }
    }
}
