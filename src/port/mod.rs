//! Port abstraction layer for serial communication.
//!
//! Provides the adapter and connector traits plus a real `serialport`-backed
//! implementation and a scripted mock for tests.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockConnector, MockSerialPort, WriteBehavior};
pub use sync_port::*;
pub use traits::*;
