//! Real-time pulse playback
//!
//! Pulses are replayed against a single monotonic start instant, so a late
//! wake-up shortens the following wait instead of accumulating drift.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::error::TransportError;
use crate::protocol::timing::SPIN_THRESHOLD_US;
use crate::types::CancelToken;
use crate::waveform::{Pulse, Waveform};

/// Longest uninterrupted sleep while waiting out a pulse
const POLL_SLICE: Duration = Duration::from_millis(5);

/// Replay `waveform`, calling `apply` at the start of every pulse
///
/// Cancellation and the optional timeout are checked before each pulse and
/// every [`POLL_SLICE`] while a pulse is held.
pub(crate) fn play<F>(
    waveform: &Waveform,
    cancel: &CancelToken,
    timeout: Option<Duration>,
    mut apply: F,
) -> Result<(), TransportError>
where
    F: FnMut(&Pulse) -> Result<(), TransportError>,
{
    let limits = Limits {
        cancel,
        start: Instant::now(),
        timeout,
    };
    let mut offset_us = 0u64;

    for (i, pulse) in waveform.pulses().iter().enumerate() {
        let held = limits.check().and_then(|()| {
            apply(pulse)?;
            offset_us += u64::from(pulse.duration_us);
            wait_until(limits.start + Duration::from_micros(offset_us), &limits)
        });
        if let Err(e) = held {
            if let TransportError::Timeout(limit) = &e {
                warn!(pulse = i, ?limit, "Transmission timed out");
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Stop conditions for one playback
struct Limits<'a> {
    cancel: &'a CancelToken,
    start: Instant,
    timeout: Option<Duration>,
}

impl Limits<'_> {
    fn check(&self) -> Result<(), TransportError> {
        self.cancel.check()?;
        match self.timeout {
            Some(limit) if self.start.elapsed() > limit => Err(TransportError::Timeout(limit)),
            _ => Ok(()),
        }
    }
}

/// Sleep most of the way in short slices, then spin for the last stretch
fn wait_until(deadline: Instant, limits: &Limits<'_>) -> Result<(), TransportError> {
    let threshold = Duration::from_micros(SPIN_THRESHOLD_US);
    loop {
        let now = Instant::now();
        if deadline <= now {
            return Ok(());
        }
        let remaining = deadline - now;
        if remaining <= threshold {
            break;
        }
        std::thread::sleep((remaining - threshold).min(POLL_SLICE));
        limits.check()?;
    }
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wave(durations: &[u32]) -> Waveform {
        let mut w = Waveform::new();
        for (i, d) in durations.iter().enumerate() {
            let mask = 1 << (i % 2);
            w.add_pulse(mask, 0, *d, false).unwrap();
        }
        w
    }

    #[test]
    fn test_play_applies_every_pulse_in_order() {
        let w = wave(&[100, 200, 300]);
        let mut seen = Vec::new();
        play(&w, &CancelToken::new(), None, |p| {
            seen.push(p.duration_us);
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![100, 200, 300]);
    }

    #[test]
    fn test_play_takes_total_duration() {
        let w = wave(&[2000, 3000]);
        let start = Instant::now();
        play(&w, &CancelToken::new(), None, |_| Ok(())).unwrap();
        assert!(start.elapsed() >= Duration::from_micros(5000));
    }

    #[test]
    fn test_play_stops_when_cancelled() {
        let w = wave(&[100, 100, 100, 100]);
        let token = CancelToken::new();
        let mut applied = 0;
        let result = play(&w, &token, None, |_| {
            applied += 1;
            if applied == 2 {
                token.cancel();
            }
            Ok(())
        });
        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert_eq!(applied, 2);
    }

    #[test]
    fn test_play_times_out() {
        let w = wave(&[20_000, 20_000, 20_000]);
        let result = play(
            &w,
            &CancelToken::new(),
            Some(Duration::from_millis(5)),
            |_| Ok(()),
        );
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }

    #[test]
    fn test_wait_until_past_deadline_returns() {
        let token = CancelToken::new();
        let limits = Limits {
            cancel: &token,
            start: Instant::now(),
            timeout: None,
        };
        let past = Instant::now();
        std::thread::sleep(Duration::from_millis(1));
        assert!(wait_until(past, &limits).is_ok());
    }

    #[test]
    fn test_cancel_interrupts_long_pulse() {
        let w = wave(&[5_000_000]);
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let start = Instant::now();
        let result = play(&w, &token, None, |_| Ok(()));
        canceller.join().unwrap();
        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_timeout_interrupts_long_pulse() {
        let w = wave(&[5_000_000]);
        let start = Instant::now();
        let result = play(
            &w,
            &CancelToken::new(),
            Some(Duration::from_millis(10)),
            |_| Ok(()),
        );
        assert!(matches!(result, Err(TransportError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
