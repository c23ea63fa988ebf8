//! Request pipeline for remote control of the transmitter
//!
//! A request carries a buffer as hex. It is validated, decoded for the log,
//! transmitted, and remembered in a bounded history:
//!
//! ```text
//! "090f03..." -> parse (1..=10 bytes, zero-padded) -> decode -> send -> history
//! ```
//!
//! A buffer that does not decode is rejected before anything is sent.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use lightwave_transport::protocol;
use lightwave_transport::{Buffer, Command, TransmitterHandle, TransportError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Errors returned to a control client
#[derive(Error, Debug)]
pub enum ControlError {
    /// Request was refused before anything reached the pin
    #[error("Rejected: {0}")]
    Rejected(TransportError),

    /// Transmission started and failed
    #[error("Transmission failed: {0}")]
    Transmission(TransportError),

    #[error("Malformed request: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<TransportError> for ControlError {
    fn from(e: TransportError) -> Self {
        if e.is_pre_transmission() {
            ControlError::Rejected(e)
        } else {
            ControlError::Transmission(e)
        }
    }
}

/// JSON request body: `{"Buffer": "090f0301050903000102"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRequest {
    #[serde(rename = "Buffer")]
    pub buffer: String,
}

/// One successfully transmitted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentRecord {
    /// Increases by one per send, starting at 1
    pub sequence: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    pub buffer: Buffer,
    pub command: Command,
}

/// Validates, sends and records control requests
pub struct ControlService {
    handle: TransmitterHandle,
    history: RwLock<VecDeque<SentRecord>>,
    history_limit: usize,
    last_sequence: AtomicU64,
}

impl ControlService {
    pub fn new(handle: TransmitterHandle, history_limit: usize) -> Self {
        Self {
            handle,
            history: RwLock::new(VecDeque::with_capacity(history_limit.min(1024))),
            history_limit: history_limit.max(1),
            last_sequence: AtomicU64::new(0),
        }
    }

    pub fn handle(&self) -> &TransmitterHandle {
        &self.handle
    }

    /// Parse a hex request into a buffer
    ///
    /// Accepts 1 to 10 bytes; short requests are zero-padded.
    pub fn parse_request(hex: &str) -> Result<Buffer, TransportError> {
        let bytes = protocol::parse_hex(hex)?;
        Buffer::from_prefix(&bytes)
    }

    /// Handle a JSON request body
    pub fn send_json(&self, body: &str) -> Result<SentRecord, ControlError> {
        let request: ControlRequest = serde_json::from_str(body)?;
        self.send_hex(&request.buffer)
    }

    /// Handle a hex request
    pub fn send_hex(&self, hex: &str) -> Result<SentRecord, ControlError> {
        let buffer = match Self::parse_request(hex) {
            Ok(b) => b,
            Err(e) => {
                warn!(request = hex, "Rejecting request: {e}");
                return Err(e.into());
            }
        };
        self.send(buffer)
    }

    /// Decode, transmit and record `buffer`
    pub fn send(&self, buffer: Buffer) -> Result<SentRecord, ControlError> {
        let command = match buffer.decode() {
            Ok(c) => c,
            Err(e) => {
                warn!(buffer = %buffer, "Rejecting undecodable buffer: {e}");
                return Err(e.into());
            }
        };
        info!(buffer = %buffer, command = %command, "Control request");

        self.handle.send_buffer(&buffer)?;

        let record = SentRecord {
            sequence: self.last_sequence.fetch_add(1, Ordering::SeqCst) + 1,
            timestamp_ms: now_ms(),
            buffer,
            command,
        };

        let mut history = self.history.write();
        while history.len() >= self.history_limit {
            history.pop_front();
        }
        history.push_back(record.clone());
        Ok(record)
    }

    /// Snapshot of the history, oldest first
    pub fn history(&self) -> Vec<SentRecord> {
        self.history.read().iter().cloned().collect()
    }

    pub fn history_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.history.read())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
