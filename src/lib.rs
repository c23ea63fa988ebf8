//! LightwaveRF transmitter application layer
//!
//! Configuration and the control request pipeline shared by the `lwtx`
//! binary. The codec, waveform builder and backends live in
//! `lightwave-transport`.

pub mod config;
pub mod control;

pub use config::LightwaveConfig;
pub use control::{ControlError, ControlRequest, ControlService, SentRecord};
