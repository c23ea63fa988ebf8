//! Configuration for the transmitter CLI
//!
//! Stored as TOML, by default in `~/.config/lightwave/lwtx.toml`:
//!
//! ```toml
//! backend = "sysfs"
//! history_limit = 256
//!
//! [transmitter]
//! pin = 22
//! period_us = 140
//! repeats = 10
//! translate = true
//! invert = false
//! gap_multiplier = 0
//! timeout_ms = 5000
//! realtime = true
//! ```
//!
//! Missing keys take their default values.

use std::path::PathBuf;

use lightwave_transport::{BackendKind, TxParams};
use serde::{Deserialize, Serialize};

/// Default number of sent buffers kept by the control service
pub const DEFAULT_HISTORY_LIMIT: usize = 256;

/// Root configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightwaveConfig {
    /// Which transmitter backend to open
    pub backend: BackendKind,
    /// Sent buffers remembered for inspection
    pub history_limit: usize,
    /// Pin and timing parameters
    pub transmitter: TxParams,
}

impl Default for LightwaveConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Null,
            history_limit: DEFAULT_HISTORY_LIMIT,
            transmitter: TxParams::default(),
        }
    }
}

impl LightwaveConfig {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lightwave")
            .join("lwtx.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: LightwaveConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a file
    pub fn save(&self, path: &PathBuf) -> anyhow::Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the transmitter would refuse later
    pub fn validate(&self) -> anyhow::Result<()> {
        self.transmitter.validate()?;
        if self.history_limit == 0 {
            anyhow::bail!("history_limit must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("lightwave-config-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = LightwaveConfig::load(&temp_path("does-not-exist.toml")).unwrap();
        assert_eq!(config, LightwaveConfig::default());
        assert_eq!(config.transmitter.pin, 22);
        assert_eq!(config.transmitter.repeats, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let content = r#"
backend = "sysfs"

[transmitter]
pin = 17
invert = true
"#;
        let config: LightwaveConfig = toml::from_str(content).unwrap();
        assert_eq!(config.backend, BackendKind::Sysfs);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.transmitter.pin, 17);
        assert!(config.transmitter.invert);
        assert_eq!(config.transmitter.period_us, 140);
        assert!(config.transmitter.translate);
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("nested/lwtx.toml");
        let mut config = LightwaveConfig::default();
        config.transmitter.repeats = 3;
        config.transmitter.timeout_ms = 0;
        config.history_limit = 8;
        config.save(&path).unwrap();

        let loaded = LightwaveConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(toml::from_str::<LightwaveConfig>(r#"backend = "pigpio""#).is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = LightwaveConfig::default();
        assert!(config.validate().is_ok());
        config.transmitter.repeats = 0;
        assert!(config.validate().is_err());
        config.transmitter.repeats = 1;
        config.history_limit = 0;
        assert!(config.validate().is_err());
    }
}
