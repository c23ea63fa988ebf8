//! Semantic commands and the buffer codec
//!
//! The parameter byte is interpreted by ranges that depend on the command
//! class. Several ranges collapse to a single command, so decoding is lossy:
//!
//! ```text
//! class 0 (off)   0..=127 Off       128..=159 Dim(p-128)  160..=191 Decrease  192..=255 AllOff
//! class 1 (on)    0..=31  On        32..=159  Dim(p mod 32)
//!                 160..=191 Increase             192..=255 AllOn(p mod 32)
//! class 2 (mood)  2..=129 Mood(p-1) 130..=255 Mood(p-129)
//! ```
//!
//! Encoding always picks one representative parameter per action.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buffer::Buffer;
use crate::error::TransportError;
use crate::protocol::{class, ADDRESS_LEN, BUFFER_SIZE};

/// Highest dim level a receiver understands (32 steps)
pub const MAX_LEVEL: u8 = 31;
/// Highest mood index whose parameter still fits in a byte
pub const MAX_MOOD: u8 = 253;

/// Representative value decode reports for Decrease and Increase
pub const STEP_VALUE: u8 = 160;
/// Representative value decode reports for AllOff
pub const ALL_OFF_VALUE: u8 = 192;

/// What the receiver should do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// On to the last used level
    On,
    Off,
    /// On at level 0..=31
    Dim(u8),
    /// Brightness up one step
    Increase,
    /// Brightness down one step
    Decrease,
    Mood(u8),
    /// Every device in the room on at level 0..=31
    AllOn(u8),
    AllOff,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::On => "On",
            Self::Off => "Off",
            Self::Dim(_) => "Dim",
            Self::Increase => "Increase",
            Self::Decrease => "Decrease",
            Self::Mood(_) => "Mood",
            Self::AllOn(_) => "AllOn",
            Self::AllOff => "AllOff",
        }
    }

    /// Value carried on the wire, with the fixed representative for actions
    /// that have no level of their own
    pub fn value(&self) -> u8 {
        match self {
            Self::On | Self::Off => 0,
            Self::Increase | Self::Decrease => STEP_VALUE,
            Self::AllOff => ALL_OFF_VALUE,
            Self::Dim(v) | Self::Mood(v) | Self::AllOn(v) => *v,
        }
    }

    /// Command class byte this action encodes to
    pub fn class(&self) -> u8 {
        match self {
            Self::Off | Self::Decrease | Self::AllOff => class::OFF,
            Self::On | Self::Dim(_) | Self::Increase | Self::AllOn(_) => class::ON,
            Self::Mood(_) => class::MOOD,
        }
    }

    /// Parse an action name (case-insensitive), taking the level or mood
    /// index from `value` when the action needs one
    pub fn parse(name: &str, value: Option<u8>) -> Result<Self, TransportError> {
        let needs_value = |v: Option<u8>| {
            v.ok_or_else(|| TransportError::Validation(format!("action \"{name}\" needs a value")))
        };
        match name.trim().to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "dim" | "level" => Ok(Self::Dim(needs_value(value)?)),
            "increase" | "up" | "brighter" => Ok(Self::Increase),
            "decrease" | "down" | "dimmer" => Ok(Self::Decrease),
            "mood" => Ok(Self::Mood(needs_value(value)?)),
            "allon" => Ok(Self::AllOn(needs_value(value)?)),
            "alloff" => Ok(Self::AllOff),
            _ => Err(TransportError::Validation(format!(
                "unknown action \"{name}\""
            ))),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dim(v) | Self::Mood(v) | Self::AllOn(v) => write!(f, "{} {}", self.name(), v),
            _ => f.write_str(self.name()),
        }
    }
}

/// A decoded (or to-be-encoded) LightwaveRF command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    pub device: u8,
    pub address: [u8; ADDRESS_LEN],
    pub room: u8,
}

impl Command {
    pub fn new(action: Action, device: u8, address: [u8; ADDRESS_LEN], room: u8) -> Self {
        Self {
            action,
            device,
            address,
            room,
        }
    }

    /// Same target, different action
    pub fn with_action(self, action: Action) -> Self {
        Self { action, ..self }
    }

    pub fn value(&self) -> u8 {
        self.action.value()
    }

    /// Encode into the wire buffer
    ///
    /// Fails when the action's value has no parameter that decodes back to
    /// the same action.
    pub fn encode(&self) -> Result<Buffer, TransportError> {
        let parameter = match self.parameter() {
            Ok(p) => p,
            Err(e) => {
                warn!(
                    action = self.action.name(),
                    value = self.action.value(),
                    "Cannot encode command: {e}"
                );
                return Err(e);
            }
        };

        let mut bytes = [0u8; BUFFER_SIZE];
        bytes[0] = (parameter >> 4) & 0x0F;
        bytes[1] = parameter & 0x0F;
        bytes[2] = self.device;
        bytes[3] = self.action.class();
        bytes[4..9].copy_from_slice(&self.address);
        bytes[9] = self.room;
        Ok(Buffer::new(bytes))
    }

    /// Representative parameter byte for this command's action
    fn parameter(&self) -> Result<u8, TransportError> {
        let unmapped = |reason| TransportError::Encoding {
            action: self.action.name(),
            value: self.action.value(),
            reason,
        };
        match self.action {
            Action::Off => Ok(64),
            Action::Decrease => Ok(160),
            Action::AllOff => Ok(192),
            Action::On => Ok(0),
            Action::Dim(v) if v <= MAX_LEVEL => Ok(v + 64),
            Action::Dim(_) => Err(unmapped("dim level must be 0..=31")),
            Action::Increase => Ok(160),
            Action::AllOn(v) if v <= MAX_LEVEL => Ok(v + 192),
            Action::AllOn(_) => Err(unmapped("level must be 0..=31")),
            Action::Mood(v) if v <= MAX_MOOD => Ok(v + 2),
            Action::Mood(_) => Err(unmapped("mood index must be 0..=253")),
        }
    }

    /// Decode a wire buffer
    ///
    /// Device, address and room are copied as-is; only the class/parameter
    /// pair can make decoding fail.
    pub fn decode(buffer: &Buffer) -> Result<Self, TransportError> {
        let param = buffer.parameter();
        let class_byte = buffer.class();

        let action = match (class_byte, param) {
            (class::OFF, 0..=127) => Action::Off,
            (class::OFF, 128..=159) => Action::Dim(param - 128),
            (class::OFF, 160..=191) => Action::Decrease,
            (class::OFF, 192..=255) => Action::AllOff,

            (class::ON, 0..=31) => Action::On,
            (class::ON, 32..=63) => Action::Dim(param - 32),
            (class::ON, 64..=95) => Action::Dim(param - 64),
            (class::ON, 96..=127) => Action::Dim(param - 96),
            (class::ON, 128..=159) => Action::Dim(param - 128),
            (class::ON, 160..=191) => Action::Increase,
            (class::ON, 192..=223) => Action::AllOn(param - 192),
            (class::ON, 224..=255) => Action::AllOn(param - 224),

            (class::MOOD, 2..=129) => Action::Mood(param - 1),
            (class::MOOD, 130..=255) => Action::Mood(param - 129),

            _ => {
                return Err(TransportError::Decoding {
                    class: class_byte,
                    param,
                })
            }
        };

        Ok(Self {
            action,
            device: buffer.device(),
            address: buffer.address(),
            room: buffer.room(),
        })
    }
}

impl TryFrom<&Buffer> for Command {
    type Error = TransportError;

    fn try_from(buffer: &Buffer) -> Result<Self, Self::Error> {
        Self::decode(buffer)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, device {}, address {:?}, room {}",
            self.action, self.device, self.address, self.room
        )
    }
}
