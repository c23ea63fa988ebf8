//! Waveform builder
//!
//! Expands a wire buffer into the list of pin pulses a transmitter has to
//! assert. The builder runs the tick state machine of a LightwaveRF sender
//! to completion in one pass, so only the backend has to keep real time.
//!
//! Every tick lasts one bit period. A toggle counter is decremented on each
//! tick: at [`timing::TRAIL_TICKS`] the line is driven low, at zero the
//! state machine dispatches and reloads the counter.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::buffer::Buffer;
use crate::error::TransportError;
use crate::nibble;
use crate::protocol::{self, timing, BUFFER_SIZE, MAX_PULSES};

/// One step of a waveform: set `on_mask` bits, clear `off_mask` bits, hold
/// for `duration_us`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    pub on_mask: u32,
    pub off_mask: u32,
    pub duration_us: u32,
}

impl Pulse {
    /// True when this pulse drives any pin high
    pub fn is_on(&self) -> bool {
        self.on_mask != 0
    }

    fn same_masks(&self, other: &Pulse) -> bool {
        self.on_mask == other.on_mask && self.off_mask == other.off_mask
    }
}

/// Ordered pulse sequence with a running total duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Waveform {
    pulses: Vec<Pulse>,
    total_duration_us: u64,
    /// Pulses requested before coalescing
    assertions: usize,
    framings: u32,
    gaps: u32,
    #[serde(skip)]
    max_pulses: usize,
}

impl Default for Waveform {
    fn default() -> Self {
        Self::new()
    }
}

impl Waveform {
    pub fn new() -> Self {
        Self::with_limit(MAX_PULSES)
    }

    /// Empty waveform holding at most `max_pulses` pulses
    pub fn with_limit(max_pulses: usize) -> Self {
        Self {
            pulses: Vec::new(),
            total_duration_us: 0,
            assertions: 0,
            framings: 0,
            gaps: 0,
            max_pulses,
        }
    }

    /// Append a pulse, merging it into the previous one when the masks match
    ///
    /// With `invert` the masks are swapped first, for transmitters whose
    /// data line is active low.
    pub fn add_pulse(
        &mut self,
        on_mask: u32,
        off_mask: u32,
        duration_us: u32,
        invert: bool,
    ) -> Result<(), TransportError> {
        let pulse = if invert {
            Pulse {
                on_mask: off_mask,
                off_mask: on_mask,
                duration_us,
            }
        } else {
            Pulse {
                on_mask,
                off_mask,
                duration_us,
            }
        };

        match self.pulses.last_mut() {
            Some(last) if last.same_masks(&pulse) => {
                last.duration_us = extend(last.duration_us, duration_us)?;
            }
            _ => {
                if self.pulses.len() >= self.max_pulses {
                    return Err(TransportError::CapacityExceeded {
                        max: self.max_pulses,
                    });
                }
                self.pulses.push(pulse);
            }
        }
        self.assertions += 1;
        self.total_duration_us += u64::from(duration_us);
        Ok(())
    }

    /// Hold the current pin state for another `duration_us`
    pub fn add_delay(&mut self, duration_us: u32) -> Result<(), TransportError> {
        match self.pulses.last_mut() {
            Some(last) => last.duration_us = extend(last.duration_us, duration_us)?,
            None => {
                if self.max_pulses == 0 {
                    return Err(TransportError::CapacityExceeded { max: 0 });
                }
                self.pulses.push(Pulse {
                    on_mask: 0,
                    off_mask: 0,
                    duration_us,
                });
            }
        }
        self.total_duration_us += u64::from(duration_us);
        Ok(())
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn total_duration_us(&self) -> u64 {
        self.total_duration_us
    }

    pub fn total_duration(&self) -> Duration {
        Duration::from_micros(self.total_duration_us)
    }

    /// Number of `add_pulse` calls, coalesced or not
    pub fn assertions(&self) -> usize {
        self.assertions
    }

    /// Messages framed (start marker through end marker)
    pub fn framings(&self) -> u32 {
        self.framings
    }

    /// Inter-message gaps emitted
    pub fn gaps(&self) -> u32 {
        self.gaps
    }
}

fn extend(current: u32, extra: u32) -> Result<u32, TransportError> {
    current.checked_add(extra).ok_or_else(|| {
        TransportError::Config(format!(
            "pulse of {current} us cannot grow by {extra} us without overflowing"
        ))
    })
}

/// Transmission parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxParams {
    /// BCM pin number of the data line
    pub pin: u32,
    /// Tick length in microseconds
    pub period_us: u32,
    /// How many times the message is sent
    pub repeats: u32,
    /// Replace each byte by its nibble line code
    pub translate: bool,
    /// Active-low data line
    pub invert: bool,
    /// Extra 72-tick gap blocks after every message (255 is about 2.6 s at 140 us)
    pub gap_multiplier: u8,
    /// Abort a transmission that takes longer than this; 0 waits forever
    pub timeout_ms: u64,
    /// Request real-time scheduling while sending
    pub realtime: bool,
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            pin: timing::DEFAULT_PIN,
            period_us: timing::DEFAULT_PERIOD_US,
            repeats: timing::DEFAULT_REPEATS,
            translate: true,
            invert: false,
            gap_multiplier: 0,
            timeout_ms: 5000,
            realtime: true,
        }
    }
}

impl TxParams {
    pub fn validate(&self) -> Result<(), TransportError> {
        protocol::pin_mask(self.pin)?;
        if self.period_us == 0 {
            return Err(TransportError::Config("period must be at least 1 us".into()));
        }
        if self.repeats == 0 {
            return Err(TransportError::Config("repeats must be at least 1".into()));
        }
        Ok(())
    }

    pub fn pin_mask(&self) -> Result<u32, TransportError> {
        protocol::pin_mask(self.pin)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Sender states, in the order a message walks through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Idle,
    MessageStart,
    ByteStart,
    SendByte,
    MessageEnd,
    GapStart,
    GapEnd,
}

/// Builds waveforms for one set of transmission parameters
#[derive(Debug, Clone)]
pub struct WaveformBuilder {
    params: TxParams,
    mask: u32,
    max_pulses: usize,
}

impl WaveformBuilder {
    pub fn new(params: TxParams) -> Result<Self, TransportError> {
        params.validate()?;
        let mask = params.pin_mask()?;
        Ok(Self {
            params,
            mask,
            max_pulses: MAX_PULSES,
        })
    }

    /// Override the pulse capacity (backends with a smaller wave memory)
    pub fn with_max_pulses(mut self, max_pulses: usize) -> Self {
        self.max_pulses = max_pulses;
        self
    }

    pub fn params(&self) -> &TxParams {
        &self.params
    }

    /// Build from a raw slice, which must be exactly one buffer long
    pub fn build_slice(&self, bytes: &[u8]) -> Result<Waveform, TransportError> {
        self.build(&Buffer::from_slice(bytes)?)
    }

    /// Run the sender state machine over `buffer` until the last repeat
    pub fn build(&self, buffer: &Buffer) -> Result<Waveform, TransportError> {
        let out = nibble::output_bytes(buffer, self.params.translate);
        let mut ticker = Ticker {
            wave: Waveform::with_limit(self.max_pulses),
            mask: self.mask,
            period_us: self.params.period_us,
            invert: self.params.invert,
        };

        let mut state = TxState::Idle;
        let mut toggle = timing::INITIAL_TOGGLE;
        let mut repeat = 0u32;
        let mut gap_repeat = 0u32;
        let mut byte_index = 0usize;
        let mut bit_mask = 0u8;
        let mut ticks = 0u64;

        loop {
            ticks += 1;
            toggle -= 1;

            if toggle == timing::TRAIL_TICKS {
                ticker.off()?;
                continue;
            }
            if toggle != 0 {
                ticker.hold()?;
                continue;
            }

            toggle = timing::HIGH_TICKS;
            match state {
                TxState::Idle => {
                    repeat = 0;
                    state = TxState::MessageStart;
                    ticker.hold()?;
                }
                TxState::MessageStart => {
                    ticker.on()?;
                    ticker.wave.framings += 1;
                    byte_index = 0;
                    state = TxState::ByteStart;
                }
                TxState::ByteStart => {
                    ticker.on()?;
                    bit_mask = 0x80;
                    state = TxState::SendByte;
                }
                TxState::SendByte => {
                    if out[byte_index] & bit_mask != 0 {
                        ticker.on()?;
                    } else {
                        toggle = timing::LOW_TICKS;
                        ticker.hold()?;
                    }
                    bit_mask >>= 1;
                    if bit_mask == 0 {
                        byte_index += 1;
                        state = if byte_index >= BUFFER_SIZE {
                            TxState::MessageEnd
                        } else {
                            TxState::ByteStart
                        };
                    }
                }
                TxState::MessageEnd => {
                    ticker.on()?;
                    gap_repeat = u32::from(self.params.gap_multiplier);
                    state = TxState::GapStart;
                }
                TxState::GapStart => {
                    toggle = timing::GAP_TICKS;
                    if gap_repeat == 0 {
                        state = TxState::GapEnd;
                    } else {
                        gap_repeat -= 1;
                    }
                    ticker.hold()?;
                }
                TxState::GapEnd => {
                    ticker.wave.gaps += 1;
                    repeat += 1;
                    ticker.hold()?;
                    if repeat >= self.params.repeats {
                        break;
                    }
                    state = TxState::MessageStart;
                }
            }
        }

        let wave = ticker.wave;
        debug!(
            buffer = %buffer,
            ticks,
            pulses = wave.len(),
            assertions = wave.assertions(),
            duration_us = wave.total_duration_us(),
            "Built waveform"
        );
        Ok(wave)
    }
}

/// Per-tick output helpers; every call accounts for exactly one period
struct Ticker {
    wave: Waveform,
    mask: u32,
    period_us: u32,
    invert: bool,
}

impl Ticker {
    fn on(&mut self) -> Result<(), TransportError> {
        self.wave
            .add_pulse(self.mask, 0, self.period_us, self.invert)
    }

    fn off(&mut self) -> Result<(), TransportError> {
        self.wave
            .add_pulse(0, self.mask, self.period_us, self.invert)
    }

    fn hold(&mut self) -> Result<(), TransportError> {
        self.wave.add_delay(self.period_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM_MAX: [u8; 10] = [0x9, 0xF, 0x3, 0x1, 0x5, 0x9, 0x3, 0x0, 0x1, 0x2];

    fn params(repeats: u32) -> TxParams {
        TxParams {
            repeats,
            ..TxParams::default()
        }
    }

    fn build(p: TxParams, bytes: [u8; 10]) -> Result<Waveform, TransportError> {
        WaveformBuilder::new(p)?.build(&Buffer::new(bytes))
    }

    #[test]
    fn test_add_pulse_coalesces_identical_masks() {
        let mut w = Waveform::new();
        w.add_pulse(1, 0, 100, false).unwrap();
        w.add_pulse(1, 0, 50, false).unwrap();
        w.add_pulse(0, 1, 10, false).unwrap();
        assert_eq!(w.len(), 2);
        assert_eq!(w.assertions(), 3);
        assert_eq!(w.pulses()[0].duration_us, 150);
        assert_eq!(w.total_duration_us(), 160);
    }

    #[test]
    fn test_add_pulse_inverts() {
        let mut w = Waveform::new();
        w.add_pulse(0b100, 0, 10, true).unwrap();
        assert_eq!(
            w.pulses()[0],
            Pulse {
                on_mask: 0,
                off_mask: 0b100,
                duration_us: 10
            }
        );
    }

    #[test]
    fn test_add_pulse_capacity() {
        let mut w = Waveform::with_limit(2);
        w.add_pulse(1, 0, 1, false).unwrap();
        w.add_pulse(0, 1, 1, false).unwrap();
        // Merging still works at capacity
        w.add_pulse(0, 1, 1, false).unwrap();
        assert!(matches!(
            w.add_pulse(1, 0, 1, false),
            Err(TransportError::CapacityExceeded { max: 2 })
        ));
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn test_add_delay_extends_last_pulse() {
        let mut w = Waveform::new();
        w.add_delay(30).unwrap();
        assert_eq!(w.pulses()[0].on_mask, 0);
        assert_eq!(w.pulses()[0].off_mask, 0);
        w.add_pulse(1, 0, 10, false).unwrap();
        w.add_delay(20).unwrap();
        assert_eq!(w.pulses()[1].duration_us, 30);
        assert_eq!(w.total_duration_us(), 60);
    }

    #[test]
    fn test_single_repeat_timing() {
        let w = build(params(1), DIM_MAX).unwrap();
        // 3 start + 4 idle + 500 per translated message
        assert_eq!(w.total_duration_us(), 507 * 140);
        assert_eq!(w.framings(), 1);
        assert_eq!(w.gaps(), 1);
        // leading off, then 72 on/off pairs
        assert_eq!(w.len(), 1 + 144);
        assert!(!w.pulses()[0].is_on());
        assert!(w.pulses()[1].is_on());
    }

    #[test]
    fn test_default_repeats_timing() {
        let w = build(TxParams::default(), DIM_MAX).unwrap();
        // 3 + 4 + 10 * 500 + 9 * 4 ticks
        assert_eq!(w.total_duration_us(), 706_020);
        assert_eq!(w.framings(), 10);
        assert_eq!(w.gaps(), 10);
        assert_eq!(w.len(), 1 + 144 * 10);
    }

    #[test]
    fn test_repeat_count_yields_framings() {
        for n in [1, 2, 5] {
            let w = build(params(n), DIM_MAX).unwrap();
            assert_eq!(w.framings(), n);
            assert_eq!(w.gaps(), n);
        }
    }

    #[test]
    fn test_gap_multiplier_extends_gap() {
        let base = build(params(1), DIM_MAX).unwrap();
        let longer = build(
            TxParams {
                gap_multiplier: 2,
                ..params(1)
            },
            DIM_MAX,
        )
        .unwrap();
        assert_eq!(
            longer.total_duration_us() - base.total_duration_us(),
            2 * 72 * 140
        );
        assert_eq!(longer.len(), base.len());
    }

    #[test]
    fn test_long_gap_overflow_is_an_error() {
        let p = TxParams {
            period_us: 1_000_000,
            gap_multiplier: 60,
            ..params(1)
        };
        let off = [0x4, 0x0, 0x3, 0x0, 0x5, 0x9, 0x3, 0x0, 0x1, 0x2];
        assert!(matches!(build(p, off), Err(TransportError::Config(_))));
    }

    #[test]
    fn test_add_delay_overflow_keeps_waveform() {
        let mut w = Waveform::new();
        w.add_pulse(1, 0, u32::MAX, false).unwrap();
        assert!(w.add_delay(1).is_err());
        assert!(w.add_pulse(1, 0, 1, false).is_err());
        assert_eq!(w.pulses()[0].duration_us, u32::MAX);
        assert_eq!(w.total_duration_us(), u64::from(u32::MAX));
    }

    #[test]
    fn test_zero_runs_coalesce() {
        let p = TxParams {
            translate: false,
            ..params(1)
        };
        let w = build(p, [0; 10]).unwrap();
        assert!(w.len() < w.assertions());
        // 3 + 4 + 4 + 10 * (4 + 8 * 7) + 4 + 72
        assert_eq!(w.total_duration_us(), 687 * 140);
    }

    #[test]
    fn test_duration_independent_of_coalescing() {
        let mut merged = Waveform::new();
        let mut naive_total = 0u64;
        for (on, off, d) in [(1, 0, 5), (1, 0, 7), (0, 1, 3), (0, 1, 3), (1, 0, 2)] {
            merged.add_pulse(on, off, d, false).unwrap();
            naive_total += u64::from(d);
        }
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.total_duration_us(), naive_total);
    }

    #[test]
    fn test_capacity_exceeded() {
        // 1 + 144 * 12 pulses > 1600
        assert!(matches!(
            build(params(12), DIM_MAX),
            Err(TransportError::CapacityExceeded { max: MAX_PULSES })
        ));
        assert!(build(params(11), DIM_MAX).is_ok());
    }

    #[test]
    fn test_smaller_pulse_limit() {
        let builder = WaveformBuilder::new(params(1)).unwrap().with_max_pulses(100);
        assert!(builder.build(&Buffer::new(DIM_MAX)).is_err());
    }

    #[test]
    fn test_invert_swaps_every_pulse() {
        let normal = build(params(1), DIM_MAX).unwrap();
        let inverted = build(
            TxParams {
                invert: true,
                ..params(1)
            },
            DIM_MAX,
        )
        .unwrap();
        assert_eq!(normal.len(), inverted.len());
        for (a, b) in normal.pulses().iter().zip(inverted.pulses()) {
            assert_eq!(a.on_mask, b.off_mask);
            assert_eq!(a.off_mask, b.on_mask);
            assert_eq!(a.duration_us, b.duration_us);
        }
    }

    #[test]
    fn test_pin_mask_used() {
        let p = TxParams {
            pin: 4,
            ..params(1)
        };
        let w = build(p, DIM_MAX).unwrap();
        assert!(w
            .pulses()
            .iter()
            .all(|pl| pl.on_mask | pl.off_mask == 1 << 4));
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(WaveformBuilder::new(params(0)).is_err());
        assert!(WaveformBuilder::new(TxParams {
            period_us: 0,
            ..params(1)
        })
        .is_err());
        assert!(WaveformBuilder::new(TxParams {
            pin: 40,
            ..params(1)
        })
        .is_err());
    }

    #[test]
    fn test_build_slice_length() {
        let builder = WaveformBuilder::new(params(1)).unwrap();
        assert!(matches!(
            builder.build_slice(&[0u8; 11]),
            Err(TransportError::Validation(_))
        ));
        assert!(builder.build_slice(&DIM_MAX).is_ok());
    }
}
