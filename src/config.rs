//! Replay configuration
//!
//! Settings come from built-in defaults, optionally overlaid by a YAML file,
//! then by command-line flags.
//!
//! ```yaml
//! serial:
//!   port: /dev/ttyUSB1
//!   baud_rate: 115200
//!   write_timeout_ms: 500
//! mode: streaming
//! continuous: true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::SourceMode;
use crate::{ReplayError, Result};

/// Serial line parity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Serial link settings.
///
/// Line parameters are carried through to [`PortInfo`](crate::PortInfo)
/// untouched; the device is expected to be configured for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
    pub write_timeout_ms: u64,
    /// Delay after opening the device before the first write
    pub settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            write_timeout_ms: 1000,
            settle_ms: 100,
        }
    }
}

impl SerialConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// Top-level replay settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub serial: SerialConfig,
    pub mode: SourceMode,
    /// Loop the capture until stopped instead of sending it once
    pub continuous: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { serial: SerialConfig::default(), mode: SourceMode::default(), continuous: true }
    }
}

impl ReplayConfig {
    /// Parse a YAML document; missing keys keep their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml)
            .map_err(|e| ReplayError::config_error("YAML parsing", e.to_string()))
    }

    /// Read and parse a YAML config file
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ReplayError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml(&yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values the transport cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.trim().is_empty() {
            return Err(ReplayError::config_error("serial.port", "port must not be empty"));
        }
        if self.serial.baud_rate == 0 {
            return Err(ReplayError::config_error("serial.baud_rate", "baud rate must be positive"));
        }
        if !(5..=8).contains(&self.serial.data_bits) {
            return Err(ReplayError::config_error(
                "serial.data_bits",
                format!("{} data bits is not supported (5-8)", self.serial.data_bits),
            ));
        }
        if !(1..=2).contains(&self.serial.stop_bits) {
            return Err(ReplayError::config_error(
                "serial.stop_bits",
                format!("{} stop bits is not supported (1-2)", self.serial.stop_bits),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_usb_adapter() {
        let config = ReplayConfig::default();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.write_timeout(), Duration::from_secs(1));
        assert_eq!(config.mode, SourceMode::Materialized);
        assert!(config.continuous);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ReplayConfig::from_yaml(
            "serial:\n  port: /dev/ttyUSB1\n  baud_rate: 115200\nmode: streaming\n",
        )
        .expect("valid yaml");

        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.parity, Parity::None);
        assert_eq!(config.serial.settle(), Duration::from_millis(100));
        assert_eq!(config.mode, SourceMode::Streaming);
        assert!(config.continuous);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let result = ReplayConfig::from_yaml("serial: [not, a, map");
        assert!(matches!(result, Err(ReplayError::Config { .. })));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = ReplayConfig::default();
        config.serial.baud_rate = 0;
        assert!(matches!(config.validate(), Err(ReplayError::Config { .. })));

        let mut config = ReplayConfig::default();
        config.serial.port = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = ReplayConfig::default();
        config.serial.stop_bits = 3;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_reads_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), "continuous: false\nserial:\n  parity: even\n")
            .expect("write config");

        let config = ReplayConfig::load(file.path()).await.expect("load");
        assert!(!config.continuous);
        assert_eq!(config.serial.parity, Parity::Even);
    }
}
