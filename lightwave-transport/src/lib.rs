//! LightwaveRF transmission layer
//!
//! This crate turns LightwaveRF commands into timed pin pulses and hands
//! them to a transmitter backend:
//!
//! ```text
//! Command -> encode -> Buffer -> (nibble translate) -> WaveformBuilder
//!                        |                                   |
//!                     decode (logging)                    Waveform
//!                                                            |
//!                                  TransmitterHandle -> [Printer] -> backend
//! ```
//!
//! Backends:
//!
//! - Null (no GPIO, records waveforms)
//! - Linux sysfs GPIO

pub mod buffer;
pub mod command;
pub mod error;
pub mod handle;
pub mod nibble;
pub mod printer;
pub mod protocol;
pub mod types;
pub mod waveform;

mod null;
mod pacing;

#[cfg(target_os = "linux")]
mod sysfs_gpio;

pub use buffer::Buffer;
pub use command::{Action, Command, MAX_LEVEL, MAX_MOOD};
pub use error::TransportError;
pub use handle::{TransmitterHandle, TxReport};
pub use printer::{OutputFormat, Printer, PrinterConfig, WaveformSummary};
pub use types::{BackendKind, CancelToken, TransmitterInfo};
pub use waveform::{Pulse, TxParams, TxState, Waveform, WaveformBuilder};

pub use null::NullTransmitter;
#[cfg(target_os = "linux")]
pub use sysfs_gpio::{SysfsGpioTransmitter, SYSFS_GPIO_ROOT};

use std::sync::Arc;

/// The transmitter capability - all backends implement this
///
/// Transmission is blocking: `transmit` returns once every pulse has been
/// asserted, or on the first device error, cancellation or timeout.
pub trait Transmitter: Send + Sync {
    /// Assert `waveform` on the pin, in order, in real time
    ///
    /// Implementations check `cancel` between pulses and leave the line
    /// low on every exit path.
    fn transmit(&self, waveform: &Waveform, cancel: &CancelToken) -> Result<(), TransportError>;

    /// Get backend information
    fn info(&self) -> &TransmitterInfo;

    /// Release the pin. Further transmissions fail.
    fn close(&self) -> Result<(), TransportError>;
}

/// Open the backend selected by `kind` for `params`
pub fn open_backend(
    kind: BackendKind,
    params: &TxParams,
) -> Result<Arc<dyn Transmitter>, TransportError> {
    match kind {
        BackendKind::Null => Ok(Arc::new(
            NullTransmitter::new(params.pin).with_timeout(params.timeout()),
        )),
        #[cfg(target_os = "linux")]
        BackendKind::Sysfs => Ok(Arc::new(SysfsGpioTransmitter::open(params)?)),
        #[cfg(not(target_os = "linux"))]
        BackendKind::Sysfs => Err(TransportError::Config(
            "sysfs GPIO backend is only available on Linux".into(),
        )),
    }
}
