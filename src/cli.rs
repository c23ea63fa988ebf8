// CLI definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use lightwave_transport::BackendKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lwtx")]
#[command(author, version, about = "LightwaveRF 433 MHz transmitter")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path (default: ~/.config/lightwave/lwtx.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Transmitter backend (overrides config)
    #[arg(long, global = true, value_enum)]
    pub backend: Option<BackendArg>,

    /// BCM pin driving the transmitter data line
    #[arg(long, global = true)]
    pub pin: Option<u32>,

    /// Number of times each message is sent
    #[arg(long, global = true)]
    pub repeats: Option<u32>,

    /// Bit period in microseconds
    #[arg(long, global = true)]
    pub period: Option<u32>,

    /// Send raw bytes instead of nibble line codes
    #[arg(long, global = true)]
    pub no_translate: bool,

    /// Data line is active low
    #[arg(long, global = true)]
    pub invert: bool,

    /// Print every waveform handed to the backend
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackendArg {
    /// Log waveforms, touch no hardware
    Null,
    /// Linux /sys/class/gpio
    Sysfs,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Null => BackendKind::Null,
            BackendArg::Sysfs => BackendKind::Sysfs,
        }
    }
}

/// Which receiver a command is addressed to
#[derive(Args, Clone, Debug)]
pub struct TargetArgs {
    /// Device index within the room
    #[arg(short, long, default_value_t = 0)]
    pub device: u8,

    /// 5-byte transmitter address as hex (e.g. 0509030001)
    #[arg(short, long)]
    pub address: String,

    /// Room index
    #[arg(short, long, default_value_t = 0)]
    pub room: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    // === Transmit Commands ===
    /// Transmit a raw 10-byte buffer given as hex
    #[command(visible_alias = "tx")]
    Send {
        /// 20 hex characters
        hex: String,
    },

    /// Encode a command and transmit it
    #[command(visible_alias = "cmd")]
    Command {
        /// on, off, dim, increase, decrease, mood, all-on, all-off
        action: String,
        /// Dim level (0-31) or mood index
        #[arg(short, long)]
        value: Option<u8>,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Send one buffer per line (hex or {"Buffer": "..."}) and print the history
    Batch {
        /// Input file (default: stdin)
        file: Option<PathBuf>,
    },

    // === Codec Commands ===
    /// Print the wire buffer for a command without sending it
    #[command(visible_alias = "enc")]
    Encode {
        action: String,
        #[arg(short, long)]
        value: Option<u8>,
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Decode a hex buffer into a command
    #[command(visible_alias = "dec")]
    Decode {
        /// 20 hex characters
        hex: String,
    },

    /// Build and describe the waveform for a buffer without sending it
    #[command(visible_alias = "wave")]
    Waveform {
        /// 20 hex characters
        hex: String,
        /// List every pulse
        #[arg(long)]
        pulses: bool,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    // === Utility Commands ===
    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        save: bool,
    },
}
