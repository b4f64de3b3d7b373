//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! All configuration sections are defined here with appropriate defaults.

use super::error::ConfigResult;
use super::probe::ProbeConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial link settings
    pub serial: SerialConfig,
    /// Transmission sequence settings
    pub sequence: SequenceConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Validate the file/env settings and freeze them for a run.
    pub fn probe_config(&self) -> ConfigResult<ProbeConfig> {
        ProbeConfig::builder(&self.serial.port)
            .baud_rate(self.serial.baud_rate)
            .timeout(self.serial.timeout())
            .interval(self.sequence.interval())
            .repeat_count(self.sequence.repeat_count)
            .await_response(self.sequence.await_response)
            .build()
    }
}

/// Serial port configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    /// Line speed; the inverter expects 9600
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout_ms: 2000,
        }
    }
}

impl SerialConfig {
    /// Get the read timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Transmission sequence section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Transmissions per phase
    pub repeat_count: u32,
    /// Delay between consecutive transmissions in milliseconds
    pub interval_ms: u64,
    /// Read back a reply after each successful send
    pub await_response: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            repeat_count: 5,
            interval_ms: 2000,
            await_response: true,
        }
    }
}

impl SequenceConfig {
    /// Get the inter-transmission delay as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Append-only log file path
    pub file: PathBuf,
    /// Console filter: "trace", "debug", "info", "warn", "error"
    pub console_level: String,
    /// File filter, same values as `console_level`
    pub file_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("rs485_test.log"),
            console_level: "info".to_string(),
            file_level: "debug".to_string(),
        }
    }
}
