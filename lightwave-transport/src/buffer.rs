//! Fixed-size LightwaveRF wire buffer
//!
//! ```text
//! byte   0      1      2       3      4..9     9
//!      [p_hi] [p_lo] [device] [class] [address] [room]
//! ```
//!
//! Only the low nibble of each byte is meaningful on air (see [`crate::nibble`]).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::command::Command;
use crate::error::TransportError;
use crate::protocol::{self, layout, ADDRESS_LEN, BUFFER_SIZE};

/// A 10-byte message, always exactly [`BUFFER_SIZE`] long
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Buffer([u8; BUFFER_SIZE]);

impl Buffer {
    pub const fn new(bytes: [u8; BUFFER_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build from a slice that must be exactly 10 bytes long
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TransportError> {
        let arr: [u8; BUFFER_SIZE] = bytes.try_into().map_err(|_| {
            TransportError::Validation(format!(
                "expected {BUFFER_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    /// Build from 1 to 10 bytes, zero-filling the tail
    ///
    /// Control requests may carry a short buffer; missing trailing bytes are
    /// sent as zero.
    pub fn from_prefix(bytes: &[u8]) -> Result<Self, TransportError> {
        if bytes.is_empty() {
            return Err(TransportError::Validation("buffer is empty".into()));
        }
        if bytes.len() > BUFFER_SIZE {
            return Err(TransportError::Validation(format!(
                "buffer too long: {} bytes, maximum is {BUFFER_SIZE}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; BUFFER_SIZE];
        arr[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse exactly 20 hex characters
    pub fn from_hex(s: &str) -> Result<Self, TransportError> {
        Self::from_slice(&protocol::parse_hex(s)?)
    }

    pub fn as_bytes(&self) -> &[u8; BUFFER_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        protocol::to_hex(&self.0)
    }

    /// Parameter byte as the receiver reassembles it
    ///
    /// Byte 0 is shifted in 8 bits, so anything above its low nibble falls
    /// off; byte 1 contributes its low nibble only.
    pub fn parameter(&self) -> u8 {
        (self.0[layout::PARAM_HIGH] << 4) | (self.0[layout::PARAM_LOW] & 0x0F)
    }

    pub fn device(&self) -> u8 {
        self.0[layout::DEVICE]
    }

    pub fn class(&self) -> u8 {
        self.0[layout::CLASS]
    }

    pub fn address(&self) -> [u8; ADDRESS_LEN] {
        let mut addr = [0u8; ADDRESS_LEN];
        addr.copy_from_slice(&self.0[layout::ADDRESS..layout::ADDRESS + ADDRESS_LEN]);
        addr
    }

    pub fn room(&self) -> u8 {
        self.0[layout::ROOM]
    }

    /// Decode into a [`Command`]
    pub fn decode(&self) -> Result<Command, TransportError> {
        Command::decode(self)
    }

    /// One-line description for logs: the decoded command, or why it failed
    pub fn describe(&self) -> String {
        match self.decode() {
            Ok(cmd) => cmd.to_string(),
            Err(e) => format!("undecodable ({e})"),
        }
    }
}

impl From<[u8; BUFFER_SIZE]> for Buffer {
    fn from(bytes: [u8; BUFFER_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Buffer {
    type Error = TransportError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        Self::from_slice(bytes)
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Buffer {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Buffer({})", self.to_hex())
    }
}

impl Serialize for Buffer {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Buffer {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Buffer::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM_MAX: [u8; 10] = [0x9, 0xF, 0x3, 0x1, 0x5, 0x9, 0x3, 0x0, 0x1, 0x2];

    #[test]
    fn test_from_slice_exact_length() {
        assert!(Buffer::from_slice(&DIM_MAX).is_ok());
        assert!(matches!(
            Buffer::from_slice(&[]),
            Err(TransportError::Validation(_))
        ));
        assert!(matches!(
            Buffer::from_slice(&[0u8; 11]),
            Err(TransportError::Validation(_))
        ));
        assert!(Buffer::from_slice(&[0u8; 9]).is_err());
    }

    #[test]
    fn test_from_prefix_pads() {
        let buf = Buffer::from_prefix(&[0x4, 0x0, 0x3]).unwrap();
        assert_eq!(buf.as_bytes(), &[0x4, 0x0, 0x3, 0, 0, 0, 0, 0, 0, 0]);
        assert!(Buffer::from_prefix(&[]).is_err());
        assert!(Buffer::from_prefix(&[0u8; 11]).is_err());
    }

    #[test]
    fn test_fields() {
        let buf = Buffer::new(DIM_MAX);
        assert_eq!(buf.parameter(), 0x9F);
        assert_eq!(buf.device(), 3);
        assert_eq!(buf.class(), 1);
        assert_eq!(buf.address(), [5, 9, 3, 0, 1]);
        assert_eq!(buf.room(), 2);
    }

    #[test]
    fn test_parameter_truncation() {
        // 0x19 << 4 keeps only 0x90; byte 1 contributes its low nibble
        let buf = Buffer::new([0x19, 0x2F, 0, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(buf.parameter(), 0x9F);
    }

    #[test]
    fn test_hex_roundtrip_and_display() {
        let buf: Buffer = "090f0301050903000102".parse().unwrap();
        assert_eq!(buf, Buffer::new(DIM_MAX));
        assert_eq!(buf.to_string(), "090f0301050903000102");
        assert_eq!(format!("{buf:?}"), "Buffer(090f0301050903000102)");
        assert!("090f".parse::<Buffer>().is_err());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let buf = Buffer::new(DIM_MAX);
        let json = serde_json::to_string(&buf).unwrap();
        assert_eq!(json, "\"090f0301050903000102\"");
        let back: Buffer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, buf);
        assert!(serde_json::from_str::<Buffer>("\"0102\"").is_err());
    }

    #[test]
    fn test_describe() {
        let buf = Buffer::new(DIM_MAX);
        assert!(buf.describe().starts_with("Dim 31"));
        let bad = Buffer::new([0, 0, 0, 7, 0, 0, 0, 0, 0, 0]);
        assert!(bad.describe().starts_with("undecodable"));
    }
}
