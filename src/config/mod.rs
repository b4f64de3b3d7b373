//! Configuration module for rs485-probe.
//!
//! This module provides TOML-based configuration with environment variable
//! overrides, and the validated [`ProbeConfig`] the run consumes.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `RS485_PROBE_CONFIG` environment variable (explicit path)
//! 2. `./rs485-probe.toml` (current directory)
//! 3. `~/.config/rs485-probe/rs485-probe.toml` (platform config directory)
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `RS485_PROBE_<SECTION>_<KEY>`
//!
//! Examples:
//! - `RS485_PROBE_SERIAL_PORT=/dev/ttyUSB1`
//! - `RS485_PROBE_SEQUENCE_INTERVAL_MS=5000`
//! - `RS485_PROBE_LOGGING_FILE=/var/log/rs485_test.log`
//!
//! # Example
//!
//! ```rust,ignore
//! use rs485_probe::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! let probe = loader.config().probe_config()?;
//! println!("Probing {} at {} baud", probe.port(), probe.baud_rate());
//! ```

mod error;
mod loader;
mod probe;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use probe::{ProbeConfig, ProbeConfigBuilder};
pub use schema::{Config, LoggingConfig, SequenceConfig, SerialConfig};
