//! Log sinks for the binary.
//!
//! The library only emits `tracing` events. This module installs the two
//! sinks an operator reads: the console at info and above, and an
//! append-only file at debug and above that also carries the raw hex.

use crate::config::{ConfigError, LoggingConfig};
use crate::error::ProbeError;
use std::path::Path;
use std::str::FromStr;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

const CONSOLE_TIME_FORMAT: &str = "%H:%M:%S";
const FILE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a level name such as `info` or `DEBUG`.
pub fn parse_level(key: &str, value: &str) -> Result<LevelFilter, ConfigError> {
    LevelFilter::from_str(value.trim())
        .map_err(|_| ConfigError::validation(key, format!("unknown log level '{value}'")))
}

/// Build the console + file subscriber without installing it.
///
/// The guard must outlive every event that should reach the file.
pub fn subscriber(
    config: &LoggingConfig,
) -> Result<(impl tracing::Subscriber + Send + Sync, WorkerGuard), ProbeError> {
    let console_level = parse_level("logging.console_level", &config.console_level)?;
    let file_level = parse_level("logging.file_level", &config.file_level)?;

    let directory = config
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = config
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            ProbeError::Logging(format!("{} is not a file path", config.file.display()))
        })?;

    // NEVER rotation appends to the same file across runs
    let file = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)
        .map_err(|e| ProbeError::Logging(format!("cannot open {}: {e}", config.file.display())))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let console = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(ChronoLocal::new(CONSOLE_TIME_FORMAT.to_string()))
        .with_target(false)
        .with_filter(console_level);

    let file = fmt::layer()
        .with_writer(file_writer)
        .with_timer(ChronoLocal::new(FILE_TIME_FORMAT.to_string()))
        .with_ansi(false)
        .with_filter(file_level);

    let subscriber = tracing_subscriber::registry().with(console).with(file);
    Ok((subscriber, guard))
}

/// Install the sinks as the global default.
pub fn init(config: &LoggingConfig) -> Result<WorkerGuard, ProbeError> {
    let (subscriber, guard) = subscriber(config)?;
    subscriber
        .try_init()
        .map_err(|e| ProbeError::Logging(e.to_string()))?;
    Ok(guard)
}
