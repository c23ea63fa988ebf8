//! Printer middleware for monitoring transmissions
//!
//! Wraps any [`Transmitter`] and prints every waveform passing through it
//! before forwarding to the wrapped backend.
//!
//! # Example
//!
//! ```ignore
//! use lightwave_transport::{NullTransmitter, Printer, PrinterConfig};
//!
//! let backend = Arc::new(NullTransmitter::new(22));
//! let monitored = Printer::wrap(backend, PrinterConfig::default().with_pulses(true));
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use crossterm::style::Stylize;
use serde::Serialize;

use crate::error::TransportError;
use crate::types::{CancelToken, TransmitterInfo};
use crate::waveform::{Pulse, Waveform};
use crate::Transmitter;

/// Output format for the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Configuration for the Printer
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// List every pulse, not just the summary
    pub show_pulses: bool,
    /// Output format
    pub format: OutputFormat,
}

impl PrinterConfig {
    pub fn with_pulses(mut self, show: bool) -> Self {
        self.show_pulses = show;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

/// Machine-readable waveform description
#[derive(Debug, Clone, Serialize)]
pub struct WaveformSummary<'a> {
    pub pulses: usize,
    pub high_pulses: usize,
    pub assertions: usize,
    pub duration_us: u64,
    pub framings: u32,
    pub gaps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pulse_list: Option<&'a [Pulse]>,
}

impl<'a> WaveformSummary<'a> {
    pub fn new(waveform: &'a Waveform, with_pulses: bool) -> Self {
        Self {
            pulses: waveform.len(),
            high_pulses: waveform.pulses().iter().filter(|p| p.is_on()).count(),
            assertions: waveform.assertions(),
            duration_us: waveform.total_duration_us(),
            framings: waveform.framings(),
            gaps: waveform.gaps(),
            pulse_list: with_pulses.then(|| waveform.pulses()),
        }
    }
}

/// One-line description of a waveform
pub fn format_summary(waveform: &Waveform) -> String {
    let s = WaveformSummary::new(waveform, false);
    format!(
        "{} pulses ({} high, {} before merging), {:.3} ms, {} framing(s), {} gap(s)",
        s.pulses,
        s.high_pulses,
        s.assertions,
        s.duration_us as f64 / 1000.0,
        s.framings,
        s.gaps
    )
}

/// One line per pulse: index, level, duration and start offset
pub fn format_pulses(waveform: &Waveform) -> Vec<String> {
    let mut offset_us = 0u64;
    waveform
        .pulses()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let level = if p.on_mask != 0 {
                "HIGH"
            } else if p.off_mask != 0 {
                "LOW "
            } else {
                "IDLE"
            };
            let line = format!(
                "{i:5}  {level}  {:6} us  @{:8} us  on={:#010x} off={:#010x}",
                p.duration_us, offset_us, p.on_mask, p.off_mask
            );
            offset_us += u64::from(p.duration_us);
            line
        })
        .collect()
}

/// Render a waveform in the configured format
pub fn render(waveform: &Waveform, config: &PrinterConfig) -> Result<String, TransportError> {
    match config.format {
        OutputFormat::Json => {
            serde_json::to_string(&WaveformSummary::new(waveform, config.show_pulses))
                .map_err(|e| TransportError::Validation(format!("cannot render waveform: {e}")))
        }
        OutputFormat::Text => {
            let mut out = format_summary(waveform);
            if config.show_pulses {
                for line in format_pulses(waveform) {
                    out.push('\n');
                    out.push_str(&line);
                }
            }
            Ok(out)
        }
    }
}

/// Transmitter middleware that prints every waveform sent
pub struct Printer {
    inner: Arc<dyn Transmitter>,
    config: PrinterConfig,
}

impl Printer {
    /// Wrap a transmitter with printing middleware
    pub fn wrap(transmitter: Arc<dyn Transmitter>, config: PrinterConfig) -> Arc<dyn Transmitter> {
        Arc::new(Self {
            inner: transmitter,
            config,
        })
    }

    fn print_waveform(&self, waveform: &Waveform) {
        let info = self.inner.info();
        match self.config.format {
            OutputFormat::Json => match render(waveform, &self.config) {
                Ok(json) => eprintln!("{json}"),
                Err(e) => eprintln!("{} {}", "!!!".red(), e),
            },
            OutputFormat::Text => {
                eprintln!(
                    "{} {}  {} pin {}  {}",
                    ">>>".cyan(),
                    "TX".cyan().bold(),
                    info.kind.name().yellow(),
                    info.pin,
                    format_summary(waveform)
                );
                if self.config.show_pulses {
                    for line in format_pulses(waveform) {
                        eprintln!("    {}", line.dim());
                    }
                }
            }
        }
    }

    fn print_result(&self, result: &Result<(), TransportError>, started: Instant) {
        if self.config.format == OutputFormat::Json {
            return;
        }
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        match result {
            Ok(()) => eprintln!(
                "{} {}  {:.3} ms",
                "<<<".green(),
                "DONE".green().bold(),
                elapsed_ms
            ),
            Err(e) => eprintln!("{} {}  {}", "<<<".red(), "FAIL".red().bold(), e),
        }
    }
}

impl Transmitter for Printer {
    fn transmit(&self, waveform: &Waveform, cancel: &CancelToken) -> Result<(), TransportError> {
        self.print_waveform(waveform);
        let started = Instant::now();
        let result = self.inner.transmit(waveform, cancel);
        self.print_result(&result, started);
        result
    }

    fn info(&self) -> &TransmitterInfo {
        self.inner.info()
    }

    fn close(&self) -> Result<(), TransportError> {
        self.inner.close()
    }
}
