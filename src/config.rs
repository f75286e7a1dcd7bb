//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::display::calibration::Calibration;
use crate::error::{GcsError, Result};
use crate::serial::{DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES};
use crate::telemetry::record::{PerSource, SourceId};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_umb_link")]
    pub umb: LinkConfig,

    #[serde(default = "default_tlm_link")]
    pub tlm: LinkConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub calibration: Calibration,
}

/// Serial link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Connect this link at startup
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// In-memory history configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_history_capacity")]
    pub capacity: usize,
}

/// CSV logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

/// Presentation configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,

    #[serde(default = "default_debug_lines")]
    pub debug_lines: usize,

    #[serde(default = "default_source")]
    pub default_source: SourceId,
}

// Default value functions
fn default_umb_link() -> LinkConfig {
    LinkConfig {
        enabled: default_enabled(),
        port: "/dev/ttyUSB0".to_string(),
        baud_rate: default_baud_rate(),
    }
}
fn default_tlm_link() -> LinkConfig {
    LinkConfig {
        enabled: default_enabled(),
        port: "/dev/ttyUSB1".to_string(),
        baud_rate: default_baud_rate(),
    }
}
fn default_enabled() -> bool { true }
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }

fn default_history_capacity() -> usize { crate::history::DEFAULT_HISTORY_CAPACITY }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_buffer_capacity() -> usize { crate::recorder::DEFAULT_BUFFER_CAPACITY }
fn default_flush_interval_ms() -> u64 { 1000 }

fn default_refresh_hz() -> u32 { 10 }
fn default_debug_lines() -> usize { crate::debug::DEFAULT_DEBUG_LINES }
fn default_source() -> SourceId { SourceId::Umb }

impl Default for Config {
    fn default() -> Self {
        Self {
            umb: default_umb_link(),
            tlm: default_tlm_link(),
            history: HistoryConfig::default(),
            logging: LoggingConfig::default(),
            display: DisplayConfig::default(),
            calibration: Calibration::default(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: default_history_capacity() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            buffer_capacity: default_buffer_capacity(),
            flush_interval_ms: default_flush_interval_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            refresh_hz: default_refresh_hz(),
            debug_lines: default_debug_lines(),
            default_source: default_source(),
        }
    }
}

impl LoggingConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl DisplayConfig {
    pub fn refresh_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.refresh_hz.max(1)))
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gcs_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Link settings per source
    pub fn links(&self) -> PerSource<&LinkConfig> {
        PerSource {
            umb: &self.umb,
            tlm: &self.tlm,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        for (source, link) in self.links().iter() {
            if link.enabled && link.port.is_empty() {
                return Err(invalid(format!("{} port cannot be empty when enabled", source)));
            }

            if !SUPPORTED_BAUD_RATES.contains(&link.baud_rate) {
                return Err(invalid(format!(
                    "{} baud_rate must be one of: {:?}",
                    source, SUPPORTED_BAUD_RATES
                )));
            }
        }

        if self.history.capacity == 0 || self.history.capacity > 100_000 {
            return Err(invalid("history capacity must be between 1 and 100000"));
        }

        if self.logging.log_dir.is_empty() {
            return Err(invalid("logging log_dir cannot be empty"));
        }

        if self.logging.buffer_capacity == 0 || self.logging.buffer_capacity > 10_000 {
            return Err(invalid("logging buffer_capacity must be between 1 and 10000"));
        }

        if self.logging.flush_interval_ms == 0 || self.logging.flush_interval_ms > 60_000 {
            return Err(invalid("logging flush_interval_ms must be between 1 and 60000"));
        }

        if self.display.refresh_hz == 0 || self.display.refresh_hz > 60 {
            return Err(invalid("display refresh_hz must be between 1 and 60"));
        }

        if self.display.debug_lines == 0 {
            return Err(invalid("display debug_lines must be at least 1"));
        }

        let threshold = self.calibration.valve_open_threshold_deg;
        if !(0.0..=180.0).contains(&threshold) {
            return Err(invalid("valve_open_threshold_deg must be between 0 and 180"));
        }

        let channels = self
            .calibration
            .analog
            .iter()
            .chain(self.calibration.thermocouple.iter());
        for cal in channels {
            if !cal.is_finite() {
                return Err(invalid("calibration gain and offset must be finite"));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> GcsError {
    GcsError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::calibration::ChannelCalibration;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.umb.port, "/dev/ttyUSB0");
        assert_eq!(config.tlm.port, "/dev/ttyUSB1");
        assert_eq!(config.display.default_source, SourceId::Umb);
    }

    #[test]
    fn test_shipped_config_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.umb.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.calibration, Calibration::default());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.history.capacity, 1000);
        assert_eq!(config.logging.buffer_capacity, 100);
        assert_eq!(config.logging.flush_interval(), Duration::from_secs(1));
        assert_eq!(config.display.refresh_period(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[umb]
port = "/dev/ttyACM0"
baud_rate = 57600

[tlm]
enabled = false
port = ""

[logging]
log_dir = "/var/log/gcs"
flush_interval_ms = 500

[display]
default_source = "TLM"

[calibration]
valve_open_threshold_deg = 100.0
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.umb.port, "/dev/ttyACM0");
        assert_eq!(config.umb.baud_rate, 57_600);
        assert!(!config.tlm.enabled);
        assert_eq!(config.logging.log_dir, "/var/log/gcs");
        assert_eq!(config.logging.flush_interval(), Duration::from_millis(500));
        assert_eq!(config.display.default_source, SourceId::Tlm);
        assert_eq!(config.calibration.valve_open_threshold_deg, 100.0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::load("/nonexistent/gcs.toml");
        assert!(matches!(result, Err(GcsError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = Config::from_toml("[umb\nport = 1");
        assert!(matches!(result, Err(GcsError::Config(_))));
    }

    #[test]
    fn test_empty_port_when_enabled() {
        let mut config = Config::default();
        config.tlm.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_port_when_disabled() {
        let mut config = Config::default();
        config.tlm.enabled = false;
        config.tlm.port = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = Config::default();
        config.umb.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valid_baud_rates() {
        for &baud in SUPPORTED_BAUD_RATES {
            let mut config = Config::default();
            config.umb.baud_rate = baud;
            assert!(config.validate().is_ok(), "Baud rate {} should be valid", baud);
        }
    }

    #[test]
    fn test_history_capacity_bounds() {
        let mut config = Config::default();
        config.history.capacity = 0;
        assert!(config.validate().is_err());
        config.history.capacity = 100_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir() {
        let mut config = Config::default();
        config.logging.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_capacity_zero() {
        let mut config = Config::default();
        config.logging.buffer_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flush_interval_bounds() {
        let mut config = Config::default();
        config.logging.flush_interval_ms = 0;
        assert!(config.validate().is_err());
        config.logging.flush_interval_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_hz_bounds() {
        let mut config = Config::default();
        config.display.refresh_hz = 0;
        assert!(config.validate().is_err());
        config.display.refresh_hz = 61;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_valve_threshold_out_of_range() {
        let mut config = Config::default();
        config.calibration.valve_open_threshold_deg = 181.0;
        assert!(config.validate().is_err());
        config.calibration.valve_open_threshold_deg = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_calibration() {
        let mut config = Config::default();
        config.calibration.thermocouple[3] = ChannelCalibration::new(f64::NAN, 0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_default_source_rejected() {
        let result = Config::from_toml("[display]\ndefault_source = \"GSE\"");
        assert!(matches!(result, Err(GcsError::Config(_))));
    }
}
