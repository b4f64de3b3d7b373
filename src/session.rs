//! Serial session lifecycle.
//!
//! A `SerialSession` owns the port handle for the duration of a run. It is
//! the only code that touches the adapter, and it releases the handle on
//! `close()` or when dropped, whichever comes first.

use crate::config::ProbeConfig;
use crate::error::{ConnectionError, TransmissionError};
use crate::packet::Packet;
use crate::port::{BufferTarget, Connector, SerialPortAdapter};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Read size for a single receive call.
const RECEIVE_CHUNK: usize = 256;

/// Upper bound on bytes collected by one `receive`.
const MAX_RESPONSE_LEN: usize = 4096;

/// Line silence, in character times, that ends a reply.
const REPLY_GAP_CHARS: u64 = 20;

/// Floor for the reply gap on fast links.
const MIN_REPLY_GAP: Duration = Duration::from_millis(10);

/// Baud rate assumed for sessions wrapped around an already-open port.
const DEFAULT_BAUD_RATE: u32 = 9600;

/// How long the line must stay quiet before a reply is considered complete.
///
/// An 8N1 character is 10 bits on the wire.
pub fn reply_gap(baud_rate: u32) -> Duration {
    let micros = REPLY_GAP_CHARS * 10 * 1_000_000 / u64::from(baud_rate.max(1));
    Duration::from_micros(micros).max(MIN_REPLY_GAP)
}

/// An open, exclusively-owned serial connection.
#[derive(Debug)]
pub struct SerialSession<P: SerialPortAdapter> {
    port: Option<P>,
    name: String,
    reply_gap: Duration,
}

impl<P: SerialPortAdapter> SerialSession<P> {
    /// Open the configured device and make sure it is usable.
    ///
    /// Both device buffers are cleared right after opening; a port that
    /// cannot do that is reported as a connection failure.
    pub fn open<C>(connector: &C, config: &ProbeConfig) -> Result<Self, ConnectionError>
    where
        C: Connector<Port = P>,
    {
        info!("Attempting to connect to {}", config.port());
        info!(
            "Configuration: {} baud, {}",
            config.baud_rate(),
            config.line().frame_format()
        );

        let mut port = connector
            .connect(config.port(), config.line())
            .map_err(|e| ConnectionError::new(config.port(), e))?;

        // Dropping `port` on this path closes the half-opened handle.
        port.clear_buffers(BufferTarget::All)
            .map_err(|e| ConnectionError::new(config.port(), e))?;

        info!("Successfully connected to {}", config.port());
        Ok(Self {
            port: Some(port),
            name: config.port().to_string(),
            reply_gap: reply_gap(config.baud_rate()),
        })
    }

    /// Wrap an already-open adapter.
    pub fn from_port(port: P) -> Self {
        let name = port.name().to_string();
        Self {
            port: Some(port),
            name,
            reply_gap: reply_gap(DEFAULT_BAUD_RATE),
        }
    }

    pub fn port_name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    /// Write `packet` in one call and flush it.
    ///
    /// Succeeds only when the device accepted every byte.
    pub fn send(&mut self, packet: &Packet) -> Result<usize, TransmissionError> {
        let port = self.port.as_mut().ok_or_else(|| {
            error!("Serial connection not established");
            TransmissionError::NotOpen
        })?;

        debug!("Sending {}: {}", packet.name(), packet.hex());

        // Stale input must not be mistaken for this packet's reply
        port.clear_buffers(BufferTarget::Input).map_err(|e| {
            error!("Serial error while clearing input buffer: {}", e);
            TransmissionError::from(e)
        })?;

        let written = port.write_bytes(packet.bytes()).map_err(|e| {
            error!("Serial error while sending {}: {}", packet.name(), e);
            TransmissionError::from(e)
        })?;

        if written != packet.len() {
            let err = TransmissionError::ShortWrite {
                written,
                expected: packet.len(),
            };
            error!("{}", err);
            return Err(err);
        }

        port.flush().map_err(|e| {
            error!("Serial error while flushing {}: {}", packet.name(), e);
            TransmissionError::from(e)
        })?;

        debug!("Successfully sent {} bytes", written);
        Ok(written)
    }

    /// Wait up to `timeout` for a reply and return whatever arrived.
    ///
    /// After the first bytes show up, reading continues until the line has
    /// been quiet for the reply gap, `timeout` has elapsed in total, or
    /// `MAX_RESPONSE_LEN` bytes are collected. An empty vector means nothing
    /// was seen in time; that is not an error.
    pub fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransmissionError> {
        let reply_gap = self.reply_gap;
        let port = self.port.as_mut().ok_or(TransmissionError::NotOpen)?;
        let started = Instant::now();
        port.set_timeout(timeout)?;

        let mut response = Vec::new();
        let mut chunk = [0u8; RECEIVE_CHUNK];

        match port.read_bytes(&mut chunk) {
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(e) if e.is_timeout() => {}
            Err(e) => {
                error!("Serial error while reading response: {}", e);
                return Err(e.into());
            }
        }

        // A frame may arrive in several bursts; keep going until the line is quiet
        while !response.is_empty() && response.len() < MAX_RESPONSE_LEN {
            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(reply_gap.min(remaining))?;

            let room = (MAX_RESPONSE_LEN - response.len()).min(RECEIVE_CHUNK);
            match port.read_bytes(&mut chunk[..room]) {
                Ok(0) => break,
                Ok(n) => response.extend_from_slice(&chunk[..n]),
                Err(e) if e.is_timeout() => break,
                Err(e) => {
                    error!("Serial error while reading response: {}", e);
                    return Err(e.into());
                }
            }
        }

        if response.is_empty() {
            debug!("No response received");
        } else {
            info!(
                "Received response ({} bytes): {}",
                response.len(),
                hex::encode(&response)
            );
        }

        Ok(response)
    }

    /// Release the port handle. Safe to call more than once.
    pub fn close(&mut self) {
        if self.port.take().is_some() {
            info!("Serial connection closed");
        }
    }
}

impl<P: SerialPortAdapter> Drop for SerialSession<P> {
    fn drop(&mut self) {
        self.close();
    }
}
