//! Scoped ownership of a transmitter
//!
//! A [`TransmitterHandle`] is the only way to send: it claims the data pin
//! for the life of the handle, serialises transmissions, and closes the
//! backend when dropped.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::buffer::Buffer;
use crate::command::Command;
use crate::error::TransportError;
use crate::types::{CancelToken, TransmitterInfo};
use crate::waveform::{TxParams, Waveform, WaveformBuilder};
use crate::Transmitter;

/// Pins currently owned by a live handle in this process
static CLAIMED_PINS: Mutex<Vec<u32>> = Mutex::new(Vec::new());

fn claim_pin(pin: u32) -> Result<(), TransportError> {
    let mut claimed = CLAIMED_PINS.lock();
    if claimed.contains(&pin) {
        return Err(TransportError::PinBusy(pin));
    }
    claimed.push(pin);
    Ok(())
}

fn release_pin(pin: u32) {
    CLAIMED_PINS.lock().retain(|&p| p != pin);
}

/// Outcome of one completed transmission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReport {
    pub buffer: Buffer,
    pub pulses: usize,
    pub duration_us: u64,
    /// Wall-clock time the backend took
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Exclusive owner of a transmitter backend
pub struct TransmitterHandle {
    backend: Arc<dyn Transmitter>,
    builder: WaveformBuilder,
    cancel: CancelToken,
    send_lock: Mutex<()>,
    pin: u32,
}

impl TransmitterHandle {
    /// Claim `params.pin` and take ownership of `backend`
    ///
    /// Fails with `PinBusy` while another handle holds the same pin.
    pub fn acquire(
        backend: Arc<dyn Transmitter>,
        params: TxParams,
    ) -> Result<Self, TransportError> {
        let pin = params.pin;
        if backend.info().pin != pin {
            return Err(TransportError::Config(format!(
                "backend drives pin {}, parameters name pin {pin}",
                backend.info().pin
            )));
        }
        let builder = WaveformBuilder::new(params)?;
        claim_pin(pin)?;

        info!(
            backend = backend.info().kind.name(),
            pin,
            path = %backend.info().device_path,
            "Transmitter acquired"
        );
        Ok(Self {
            backend,
            builder,
            cancel: CancelToken::new(),
            send_lock: Mutex::new(()),
            pin,
        })
    }

    pub fn params(&self) -> &TxParams {
        self.builder.params()
    }

    pub fn info(&self) -> &TransmitterInfo {
        self.backend.info()
    }

    /// Token that aborts the transmission in flight (and later ones, until
    /// [`CancelToken::reset`])
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Build the waveform for `buffer` without sending it
    pub fn build_waveform(&self, buffer: &Buffer) -> Result<Waveform, TransportError> {
        self.builder.build(buffer)
    }

    /// Send a raw buffer, blocking until the waveform has been asserted
    ///
    /// The waveform is fully built before the backend is touched, so codec
    /// and capacity failures never produce partial output.
    pub fn send_buffer(&self, buffer: &Buffer) -> Result<TxReport, TransportError> {
        let waveform = self.builder.build(buffer)?;
        info!(
            buffer = %buffer,
            command = %buffer.describe(),
            repeats = self.params().repeats,
            "Sending"
        );

        let _guard = self.send_lock.lock();
        self.cancel.check()?;

        let started = Instant::now();
        if let Err(e) = self.backend.transmit(&waveform, &self.cancel) {
            warn!(buffer = %buffer, "Transmission failed: {e}");
            return Err(e);
        }
        let elapsed = started.elapsed();
        debug!(
            pulses = waveform.len(),
            expected_us = waveform.total_duration_us(),
            elapsed_us = elapsed.as_micros() as u64,
            "Transmission complete"
        );

        Ok(TxReport {
            buffer: *buffer,
            pulses: waveform.len(),
            duration_us: waveform.total_duration_us(),
            elapsed,
        })
    }

    /// Encode and send a command
    pub fn send_command(&self, command: &Command) -> Result<TxReport, TransportError> {
        let buffer = command.encode()?;
        self.send_buffer(&buffer)
    }
}

impl Drop for TransmitterHandle {
    fn drop(&mut self) {
        if let Err(e) = self.backend.close() {
            warn!(pin = self.pin, "Failed to close transmitter: {e}");
        }
        release_pin(self.pin);
        debug!(pin = self.pin, "Transmitter released");
    }
}
