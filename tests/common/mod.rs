//! Shared test utilities for rs485-probe integration tests.
//!
//! - Probe configurations with test-friendly timing
//! - A connector that hands out any adapter once
//! - A virtual clock starting at a fixed instant

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use rs485_probe::config::ProbeConfig;
use rs485_probe::port::{Connector, PortConfiguration, PortError, SerialPortAdapter};
use rs485_probe::ManualClock;
use std::cell::RefCell;
use std::time::Duration;

/// Config for `MOCK0` with the given repeat count and interval.
pub fn probe_config(repeat_count: u32, interval: Duration) -> ProbeConfig {
    ProbeConfig::builder("MOCK0")
        .repeat_count(repeat_count)
        .interval(interval)
        .timeout(Duration::from_millis(200))
        .build()
        .expect("valid test config")
}

/// A clock frozen at 2024-06-01 08:00:00 UTC until something sleeps.
pub fn test_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
}

/// Connector that yields a prepared adapter on the first connect.
pub struct OnceConnector<P> {
    port: RefCell<Option<P>>,
}

impl<P> OnceConnector<P> {
    pub fn new(port: P) -> Self {
        Self {
            port: RefCell::new(Some(port)),
        }
    }
}

impl<P: SerialPortAdapter> Connector for OnceConnector<P> {
    type Port = P;

    fn connect(&self, port_name: &str, _config: &PortConfiguration) -> Result<P, PortError> {
        self.port
            .borrow_mut()
            .take()
            .ok_or_else(|| PortError::config(format!("{port_name} already handed out")))
    }
}
