//! Configuration for the virtmem host
//!
//! Loads configuration from a TOML file. Every field has a default, so a
//! file only needs the values it changes; command line flags override both.

use crate::backoff::Backoff;
use crate::error::{Error, Result};
use crate::supervisor::LinkConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub link: LinkSettings,
    pub passthrough: PassthroughConfig,
    pub logging: LoggingConfig,
}

/// Device link parameters
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial device connected to the board
    pub port: String,
    pub baud_rate: u32,
    /// Byte that introduces an in-band command
    pub escape_value: u8,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115_200,
            escape_value: 0xFF,
        }
    }
}

fn default_port() -> &'static str {
    if cfg!(windows) { "COM3" } else { "/dev/ttyACM0" }
}

/// Reconnect and polling timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LinkSettings {
    /// First wait between failed open attempts
    pub retry_interval_ms: u64,
    /// Upper bound for the wait between open attempts
    pub max_retry_interval_ms: u64,
    /// Growth factor per failed attempt (1.0 = fixed interval)
    pub retry_multiplier: f64,
    /// Pause after opening (boards that reset on connect)
    pub settle_ms: u64,
    /// Sleep between polls when the link is quiet
    pub idle_poll_ms: u64,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            retry_interval_ms: 500,
            max_retry_interval_ms: 2000,
            retry_multiplier: 1.0,
            settle_ms: 1000,
            idle_poll_ms: 1,
        }
    }
}

impl LinkSettings {
    pub fn to_link_config(&self) -> LinkConfig {
        LinkConfig {
            backoff: Backoff::exponential(
                Duration::from_millis(self.retry_interval_ms),
                Duration::from_millis(self.max_retry_interval_ms),
                self.retry_multiplier,
            ),
            settle: Duration::from_millis(self.settle_ms),
            idle_poll: Duration::from_millis(self.idle_poll_ms),
        }
    }
}

/// Optional second serial device used for display output and input lines
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PassthroughConfig {
    /// Pass-through serial device; stdin/stdout when absent
    pub device: Option<String>,
    pub baud_rate: u32,
}

impl Default for PassthroughConfig {
    fn default() -> Self {
        Self {
            device: None,
            baud_rate: 115_200,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use virtmem_host::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("virtmem.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(Error::InvalidParameter("serial port is empty".to_string()));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::InvalidParameter("baud rate must be > 0".to_string()));
        }
        if self.passthrough.baud_rate == 0 {
            return Err(Error::InvalidParameter(
                "pass-through baud rate must be > 0".to_string(),
            ));
        }
        if self.link.retry_multiplier.is_nan() || self.link.retry_multiplier < 1.0 {
            return Err(Error::InvalidParameter(format!(
                "retry multiplier must be >= 1.0, got {}",
                self.link.retry_multiplier
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.escape_value, 0xFF);
        assert_eq!(config.passthrough.device, None);
        assert_eq!(config.link.retry_interval_ms, 500);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_link_is_fixed_interval() {
        let link = LinkSettings::default().to_link_config();
        assert_eq!(link.backoff.delay(0), Duration::from_millis(500));
        assert_eq!(link.backoff.delay(5), Duration::from_millis(500));
        assert_eq!(link.settle, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_toml() {
        let toml_content = r#"
[serial]
port = "/dev/ttyUSB0"
escape_value = 16

[link]
settle_ms = 0
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.escape_value, 0x10);
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.link.settle_ms, 0);
        assert_eq!(config.link.retry_interval_ms, 500);
    }

    #[test]
    fn test_toml_serialization() {
        let mut config = AppConfig::default();
        config.passthrough.device = Some("/dev/ttyUSB1".to_string());
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[serial]"));
        assert!(toml_string.contains("[link]"));
        assert!(toml_string.contains("[passthrough]"));
        assert!(toml_string.contains("[logging]"));
        assert!(toml_string.contains("device = \"/dev/ttyUSB1\""));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("virtmem.toml");

        let mut config = AppConfig::default();
        config.serial.baud_rate = 57_600;
        config.link.retry_multiplier = 2.0;
        config.to_file(&path).unwrap();

        assert_eq!(AppConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.serial.baud_rate = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.link.retry_multiplier = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[serial\nport = 3").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(Error::Config(_))));
    }
}
