//! Integration tests for the transmit pipeline.
//!
//! These exercise the public API end to end: encoding a command, building
//! its waveform, demodulating the pulses back into bytes, and sending
//! through a handle with the null backend.

use std::sync::Arc;

use lightwave_transport::nibble::nibble_from_code;
use lightwave_transport::protocol::timing;
use lightwave_transport::{
    Action, Buffer, Command, NullTransmitter, Printer, PrinterConfig, TransmitterHandle,
    TransportError, TxParams, Waveform, WaveformBuilder,
};

const PERIOD: u32 = timing::DEFAULT_PERIOD_US;

/// Recover the bit stream of every message in a waveform
///
/// A high pulse is a 1 bit; the low that follows lasts the trailer plus
/// seven ticks per 0 bit, or at least a full gap at the end of a message.
fn demodulate(wave: &Waveform) -> Vec<Vec<u8>> {
    let pulses = wave.pulses();
    let mut messages = Vec::new();
    let mut bits = Vec::new();

    // Leading low before the first start marker
    let mut i = 1;
    while i < pulses.len() {
        let high = &pulses[i];
        assert!(high.is_on(), "pulse {i} should be high");
        assert_eq!(high.duration_us, 2 * PERIOD);
        bits.push(1u8);

        let Some(low) = pulses.get(i + 1) else { break };
        let low_ticks = low.duration_us / PERIOD;
        if low_ticks >= timing::GAP_TICKS {
            messages.push(std::mem::take(&mut bits));
        } else {
            let zeros = (low_ticks - timing::TRAIL_TICKS) / timing::LOW_TICKS;
            bits.extend(std::iter::repeat(0u8).take(zeros as usize));
        }
        i += 2;
    }
    messages
}

/// Strip framing (start marker, per-byte start bit, end marker) into bytes
fn unframe(bits: &[u8]) -> Vec<u8> {
    assert_eq!(bits.len(), 1 + 10 * 9 + 1);
    assert_eq!(bits[0], 1);
    assert_eq!(bits[bits.len() - 1], 1);
    bits[1..bits.len() - 1]
        .chunks(9)
        .map(|chunk| {
            assert_eq!(chunk[0], 1, "byte start marker");
            chunk[1..].iter().fold(0u8, |acc, b| (acc << 1) | b)
        })
        .collect()
}

fn params(repeats: u32) -> TxParams {
    TxParams {
        repeats,
        ..TxParams::default()
    }
}

// ── Command → buffer → waveform → bytes ──

#[test]
fn pipeline_waveform_carries_translated_buffer() {
    let cmd = Command::new(Action::Dim(31), 3, [5, 9, 3, 0, 1], 2);
    let buffer = cmd.encode().unwrap();
    let wave = WaveformBuilder::new(params(3)).unwrap().build(&buffer).unwrap();

    let messages = demodulate(&wave);
    assert_eq!(messages.len(), 3);
    for bits in &messages {
        let decoded: Vec<u8> = unframe(bits)
            .into_iter()
            .map(|code| nibble_from_code(code).expect("valid line code"))
            .collect();
        assert_eq!(decoded, buffer.as_bytes());
    }

    let back = Command::decode(&buffer).unwrap();
    assert_eq!(back, cmd);
}

#[test]
fn pipeline_untranslated_sends_raw_bytes() {
    let raw = Buffer::new([0xA5, 0x0F, 0xF0, 0x01, 0x80, 0x7E, 0x00, 0xFF, 0x55, 0xAA]);
    let p = TxParams {
        translate: false,
        ..params(1)
    };
    let wave = WaveformBuilder::new(p).unwrap().build(&raw).unwrap();
    let messages = demodulate(&wave);
    assert_eq!(messages.len(), 1);
    assert_eq!(unframe(&messages[0]), raw.as_bytes());
}

#[test]
fn pipeline_total_duration_matches_pulse_sum() {
    let buffer: Buffer = "040003000509030001 02".parse().unwrap();
    let wave = WaveformBuilder::new(params(10)).unwrap().build(&buffer).unwrap();
    let sum: u64 = wave.pulses().iter().map(|p| u64::from(p.duration_us)).sum();
    assert_eq!(sum, wave.total_duration_us());
    assert_eq!(wave.total_duration_us(), 706_020);
}

// ── Sending through a handle ──

#[test]
fn handle_sends_each_repeat_once() {
    let backend = Arc::new(NullTransmitter::new(20));
    let p = TxParams {
        pin: 20,
        ..params(4)
    };
    let monitored = Printer::wrap(backend.clone(), PrinterConfig::default());
    let handle = TransmitterHandle::acquire(monitored, p).unwrap();

    let off = Command::new(Action::Off, 3, [5, 9, 3, 0, 1], 2);
    let report = handle.send_command(&off).unwrap();
    assert_eq!(report.buffer.to_hex(), "04000300050903000102");

    let sent = backend.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].framings(), 4);
    assert_eq!(demodulate(&sent[0]).len(), 4);
}

#[test]
fn handle_rejects_oversized_waveform_before_sending() {
    let backend = Arc::new(NullTransmitter::new(21));
    let p = TxParams {
        pin: 21,
        ..params(20)
    };
    let handle = TransmitterHandle::acquire(backend.clone(), p).unwrap();
    let result = handle.send_buffer(&Buffer::new([0x9, 0xF, 3, 1, 5, 9, 3, 0, 1, 2]));
    assert!(matches!(
        result,
        Err(TransportError::CapacityExceeded { max: 1600 })
    ));
    assert_eq!(backend.sent_count(), 0);
}

#[test]
fn handle_rejects_bad_length_before_sending() {
    for bytes in [&[][..], &[0u8; 11][..]] {
        assert!(matches!(
            Buffer::from_slice(bytes),
            Err(TransportError::Validation(_))
        ));
    }
}
