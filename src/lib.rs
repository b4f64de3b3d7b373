//! RS-485 link diagnostics for solar inverters.
//!
//! Opens a serial port, sends a fixed three-phase sequence of pre-encoded
//! command frames at timed intervals, and reports which transmissions went
//! through and what came back.
//!
//! # Modules
//!
//! - `config`: TOML/env configuration and the validated `ProbeConfig`
//! - `port`: serial adapter and connector traits, real and mock ports
//! - `session`: exclusive ownership of an open port
//! - `runner`: the phased transmission loop
//! - `report`: per-attempt, per-phase and per-run results
//! - `packet`: the command frames
//! - `clock`: time source used for pacing and timestamps
//! - `logging`: console and file sinks for the binary
//! - `error`: connection, transmission and top-level errors

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod packet;
pub mod port;
pub mod report;
pub mod runner;
pub mod session;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, ProbeConfig};
pub use error::{ConnectionError, ConnectionFailure, ProbeError, TransmissionError};
pub use packet::{Packet, OFFLINE_QUERY, REMOVE_REGISTER};
pub use port::{
    Connector, MockConnector, MockSerialPort, PortConfiguration, PortError, SerialPortAdapter,
    SyncSerialPort, SystemConnector,
};
pub use report::{PhaseSummary, SessionReport, TransmissionResult};
pub use runner::{PhaseRunner, PhaseSpec, TEST_PLAN};
pub use session::SerialSession;
