//! Session and application error types.
//!
//! `ConnectionError` is fatal for a run, `TransmissionError` only ever fails a
//! single attempt, and `ProbeError` is what the binary maps to an exit status.

use crate::config::ConfigError;
use crate::port::PortError;
use std::fmt;
use std::io;
use thiserror::Error;

/// Why a port could not be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// The device path does not exist.
    NotFound,
    /// Another process holds the device.
    Busy,
    /// The user may not open the device.
    PermissionDenied,
    /// The OS rejected the line settings.
    InvalidSettings,
    /// Anything else.
    Other,
}

impl ConnectionFailure {
    /// Classify an open failure reported by a port adapter.
    pub fn classify(err: &PortError) -> Self {
        match err {
            PortError::NotFound(_) => Self::NotFound,
            PortError::Config(_) => Self::InvalidSettings,
            _ => match err.io_kind() {
                Some(io::ErrorKind::NotFound) => Self::NotFound,
                Some(io::ErrorKind::PermissionDenied) => Self::PermissionDenied,
                Some(io::ErrorKind::ResourceBusy) | Some(io::ErrorKind::AddrInUse) => Self::Busy,
                Some(io::ErrorKind::InvalidInput) => Self::InvalidSettings,
                _ => Self::Other,
            },
        }
    }
}

impl fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "device not found"),
            Self::Busy => write!(f, "device busy"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::InvalidSettings => write!(f, "invalid line settings"),
            Self::Other => write!(f, "open failed"),
        }
    }
}

/// The serial session could not be established.
#[derive(Debug, Error)]
#[error("Failed to connect to {port} ({failure}): {source}")]
pub struct ConnectionError {
    pub port: String,
    pub failure: ConnectionFailure,
    #[source]
    pub source: PortError,
}

impl ConnectionError {
    pub fn new(port: impl Into<String>, source: PortError) -> Self {
        Self {
            port: port.into(),
            failure: ConnectionFailure::classify(&source),
            source,
        }
    }
}

/// A single send or receive did not go through.
#[derive(Debug, Error)]
pub enum TransmissionError {
    /// The device accepted fewer bytes than the packet holds.
    #[error("Failed to send complete packet. Sent {written}/{expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// The adapter reported an error.
    #[error("Serial error: {0}")]
    Port(#[from] PortError),

    /// The session was already closed.
    #[error("Serial connection not established")]
    NotOpen,
}

/// Top-level failures surfaced by the binary.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Port(#[from] PortError),
}
