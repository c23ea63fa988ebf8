//! Transmitter without GPIO access
//!
//! Used on machines without a radio attached. Every waveform is logged and
//! kept so callers can inspect what would have gone on air.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::pacing;
use crate::types::{BackendKind, CancelToken, TransmitterInfo};
use crate::waveform::Waveform;
use crate::Transmitter;

/// Records waveforms instead of asserting them
pub struct NullTransmitter {
    info: TransmitterInfo,
    /// Replay pulse timing so a send takes as long as a real one
    paced: bool,
    timeout: Option<Duration>,
    sent: Mutex<Vec<Waveform>>,
    closed: AtomicBool,
}

impl NullTransmitter {
    pub fn new(pin: u32) -> Self {
        Self {
            info: TransmitterInfo {
                kind: BackendKind::Null,
                pin,
                device_path: "null".to_string(),
            },
            paced: false,
            timeout: None,
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Block for the waveform's duration on every send
    pub fn with_pacing(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Waveforms transmitted so far, oldest first
    pub fn sent(&self) -> Vec<Waveform> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transmitter for NullTransmitter {
    fn transmit(&self, waveform: &Waveform, cancel: &CancelToken) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Device("transmitter is closed".into()));
        }

        info!(
            pin = self.info.pin,
            pulses = waveform.len(),
            duration_us = waveform.total_duration_us(),
            "No GPIO backend, not transmitting"
        );

        if self.paced {
            pacing::play(waveform, cancel, self.timeout, |_| Ok(()))?;
        } else {
            cancel.check()?;
        }

        self.sent.lock().push(waveform.clone());
        Ok(())
    }

    fn info(&self) -> &TransmitterInfo {
        &self.info
    }

    fn close(&self) -> Result<(), TransportError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(pin = self.info.pin, "Null transmitter closed");
        }
        Ok(())
    }
}
