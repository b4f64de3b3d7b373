//! Validated, immutable settings for one diagnostic run.

use super::error::{ConfigError, ConfigResult};
use crate::port::{DataBits, FlowControl, Parity, PortConfiguration, StopBits};
use std::time::Duration;

/// Everything the session and phase runner need, already checked.
///
/// Only obtainable through [`ProbeConfigBuilder::build`], so a value of this
/// type always has `repeat_count >= 1` and a non-zero timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    port: String,
    line: PortConfiguration,
    interval: Duration,
    repeat_count: u32,
    await_response: bool,
}

impl ProbeConfig {
    /// Start from the inverter defaults for `port`.
    pub fn builder(port: impl Into<String>) -> ProbeConfigBuilder {
        ProbeConfigBuilder::new(port)
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Line settings handed to the connector.
    pub fn line(&self) -> &PortConfiguration {
        &self.line
    }

    pub fn baud_rate(&self) -> u32 {
        self.line.baud_rate
    }

    /// Upper bound on the wait for a reply.
    pub fn timeout(&self) -> Duration {
        self.line.timeout
    }

    /// Delay between consecutive transmissions.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Transmissions per phase.
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn await_response(&self) -> bool {
        self.await_response
    }
}

/// Builder for [`ProbeConfig`].
#[derive(Debug, Clone)]
pub struct ProbeConfigBuilder {
    port: String,
    baud_rate: u32,
    timeout: Duration,
    interval: Duration,
    repeat_count: u32,
    await_response: bool,
}

impl ProbeConfigBuilder {
    fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: 9600,
            timeout: Duration::from_secs(2),
            interval: Duration::from_secs(2),
            repeat_count: 5,
            await_response: true,
        }
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn repeat_count(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn await_response(mut self, await_response: bool) -> Self {
        self.await_response = await_response;
        self
    }

    /// Check the invariants and produce the frozen config.
    pub fn build(self) -> ConfigResult<ProbeConfig> {
        if self.port.trim().is_empty() {
            return Err(ConfigError::validation("serial.port", "must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::validation("serial.baud_rate", "must be positive"));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::validation("serial.timeout_ms", "must be positive"));
        }
        if self.repeat_count == 0 {
            return Err(ConfigError::validation(
                "sequence.repeat_count",
                "must be at least 1",
            ));
        }

        Ok(ProbeConfig {
            port: self.port,
            line: PortConfiguration {
                baud_rate: self.baud_rate,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                parity: Parity::None,
                stop_bits: StopBits::One,
                timeout: self.timeout,
            },
            interval: self.interval,
            repeat_count: self.repeat_count,
            await_response: self.await_response,
        })
    }
}
