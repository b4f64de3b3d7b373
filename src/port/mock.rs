//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates an RS-485 device without
//! requiring actual hardware. Writes can be scripted to come up short or
//! fail, and replies can be queued so they "arrive" after the next write.

use super::error::PortError;
use super::traits::{BufferTarget, Connector, PortConfiguration, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// How the mock answers a particular write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBehavior {
    /// Accept every byte.
    Full,
    /// Accept only the first `n` bytes and report `n`.
    Short(usize),
    /// Fail the call with an I/O error of this kind.
    Fail(io::ErrorKind),
}

/// Inner state of the mock port, shared between clones.
#[derive(Debug, Default)]
struct MockPortState {
    /// Bytes waiting to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Replies released into `read_queue` one per accepted write.
    replies: VecDeque<Vec<u8>>,
    /// Log of all bytes accepted by the port, one entry per write call.
    write_log: Vec<Vec<u8>>,
    /// Number of write calls seen so far.
    write_calls: usize,
    /// Scripted behaviour keyed by 1-based write call number.
    write_script: HashMap<usize, WriteBehavior>,
    /// Error kind returned by the next read, if any.
    next_read_error: Option<io::ErrorKind>,
    /// Every timeout set on the port, in order.
    timeouts: Vec<Duration>,
    /// Every clear request in order.
    clears: Vec<BufferTarget>,
    /// Number of flush calls.
    flushes: usize,
    /// Fail clear requests with this kind.
    clear_error: Option<io::ErrorKind>,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// session owns another.
///
/// # Example
/// ```
/// use rs485_probe::port::{MockSerialPort, SerialPortAdapter, WriteBehavior};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.queue_reply(&[0xaa, 0x55]);
/// port.script_write(2, WriteBehavior::Short(3));
///
/// assert_eq!(port.write_bytes(&[1, 2, 3, 4]).unwrap(), 4);
/// assert_eq!(port.write_bytes(&[1, 2, 3, 4]).unwrap(), 3);
///
/// let mut buffer = [0u8; 8];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], &[0xaa, 0x55]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    /// The internal state, shared between clones.
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
        }
    }

    /// Make bytes immediately available to read.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Queue a reply that becomes readable after the next accepted write.
    pub fn queue_reply(&mut self, data: &[u8]) {
        self.state.lock().replies.push_back(data.to_vec());
    }

    /// Script the outcome of the `call`-th write (1-based).
    pub fn script_write(&mut self, call: usize, behavior: WriteBehavior) {
        self.state.lock().write_script.insert(call, behavior);
    }

    /// Make the next read fail with the given error kind.
    pub fn fail_next_read(&mut self, kind: io::ErrorKind) {
        self.state.lock().next_read_error = Some(kind);
    }

    /// Make every clear request fail with the given error kind.
    pub fn fail_clears(&mut self, kind: io::ErrorKind) {
        self.state.lock().clear_error = Some(kind);
    }

    /// Get a copy of all data accepted by the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Number of write calls made, including failed ones.
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }

    /// Every clear request seen so far, in order.
    pub fn clears(&self) -> Vec<BufferTarget> {
        self.state.lock().clears.clone()
    }

    /// Number of flush calls made.
    pub fn flushes(&self) -> usize {
        self.state.lock().flushes
    }

    /// Every timeout set so far, in order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.state.lock().timeouts.clone()
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// How many other handles to this port are still alive.
    ///
    /// Drops to zero once a session has released its copy.
    pub fn outstanding_handles(&self) -> usize {
        Arc::strong_count(&self.state) - 1
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        state.write_calls += 1;
        let call = state.write_calls;

        let accepted = match state.write_script.get(&call).copied() {
            Some(WriteBehavior::Fail(kind)) => {
                return Err(PortError::Io(io::Error::new(kind, "scripted write failure")));
            }
            Some(WriteBehavior::Short(n)) => n.min(data.len()),
            Some(WriteBehavior::Full) | None => data.len(),
        };

        state.write_log.push(data[..accepted].to_vec());
        if let Some(reply) = state.replies.pop_front() {
            state.read_queue.extend(reply);
        }

        Ok(accepted)
    }

    fn flush(&mut self) -> Result<(), PortError> {
        self.state.lock().flushes += 1;
        Ok(())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if let Some(kind) = state.next_read_error.take() {
            return Err(PortError::Io(io::Error::new(kind, "scripted read failure")));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            // Same shape as an expired read on a real port
            Err(PortError::Io(io::Error::new(
                io::ErrorKind::TimedOut,
                "Operation timed out",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        self.state.lock().timeouts.push(timeout);
        Ok(())
    }

    fn clear_buffers(&mut self, target: BufferTarget) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if let Some(kind) = state.clear_error {
            return Err(PortError::Io(io::Error::new(kind, "scripted clear failure")));
        }
        if matches!(target, BufferTarget::Input | BufferTarget::All) {
            state.read_queue.clear();
        }
        state.clears.push(target);
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Connector that hands out a `MockSerialPort` or a scripted open failure.
#[derive(Debug, Clone)]
pub struct MockConnector {
    port: Option<MockSerialPort>,
    failure: Option<io::ErrorKind>,
    attempts: Arc<Mutex<Vec<(String, PortConfiguration)>>>,
}

impl MockConnector {
    /// Every connect succeeds with a clone of `port`.
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port: Some(port),
            failure: None,
            attempts: Arc::default(),
        }
    }

    /// Every connect fails with an I/O error of this kind.
    pub fn failing(kind: io::ErrorKind) -> Self {
        Self {
            port: None,
            failure: Some(kind),
            attempts: Arc::default(),
        }
    }

    /// Every connect fails as if the device did not exist.
    pub fn missing() -> Self {
        Self {
            port: None,
            failure: None,
            attempts: Arc::default(),
        }
    }

    /// Port names and settings passed to `connect`, in order.
    pub fn attempts(&self) -> Vec<(String, PortConfiguration)> {
        self.attempts.lock().clone()
    }
}

impl Connector for MockConnector {
    type Port = MockSerialPort;

    fn connect(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<MockSerialPort, PortError> {
        self.attempts
            .lock()
            .push((port_name.to_string(), config.clone()));

        match (&self.port, self.failure) {
            (Some(port), _) => Ok(port.clone()),
            (None, Some(kind)) => Err(PortError::Io(io::Error::new(
                kind,
                format!("cannot open {port_name}"),
            ))),
            (None, None) => Err(PortError::not_found(port_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_reply_released_by_write() {
        let mut port = MockSerialPort::new("MOCK0");
        port.queue_reply(&[0x01, 0x02]);
        assert_eq!(port.available_bytes(), 0);

        port.write_bytes(&[0xff]).unwrap();
        assert_eq!(port.available_bytes(), 2);
    }

    #[test]
    fn test_short_write_script() {
        let mut port = MockSerialPort::new("MOCK0");
        port.script_write(1, WriteBehavior::Short(3));

        assert_eq!(port.write_bytes(&[0u8; 9]).unwrap(), 3);
        assert_eq!(port.write_bytes(&[0u8; 9]).unwrap(), 9);
        assert_eq!(port.get_write_log()[0].len(), 3);
        assert_eq!(port.write_calls(), 2);
    }

    #[test]
    fn test_failed_write_script() {
        let mut port = MockSerialPort::new("MOCK0");
        port.script_write(1, WriteBehavior::Fail(io::ErrorKind::BrokenPipe));

        let err = port.write_bytes(b"x").unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::BrokenPipe));
        assert!(port.get_write_log().is_empty());
        assert_eq!(port.write_calls(), 1);
    }

    #[test]
    fn test_empty_read_times_out() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut buffer = [0u8; 10];

        let err = port.read_bytes(&mut buffer).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_clear_input_drops_pending_bytes() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"stale");

        port.clear_buffers(BufferTarget::Input).unwrap();
        assert_eq!(port.available_bytes(), 0);
        assert_eq!(port.clears(), vec![BufferTarget::Input]);
    }

    #[test]
    fn test_outstanding_handles() {
        let port = MockSerialPort::new("MOCK0");
        assert_eq!(port.outstanding_handles(), 0);

        let held = port.clone();
        assert_eq!(port.outstanding_handles(), 1);
        drop(held);
        assert_eq!(port.outstanding_handles(), 0);
    }

    #[test]
    fn test_connector_variants() {
        let config = PortConfiguration::default();

        let ok = MockConnector::new(MockSerialPort::new("MOCK0"));
        assert!(ok.connect("MOCK0", &config).is_ok());
        assert_eq!(ok.attempts().len(), 1);

        let denied = MockConnector::failing(io::ErrorKind::PermissionDenied);
        let err = denied.connect("/dev/ttyUSB0", &config).unwrap_err();
        assert_eq!(err.io_kind(), Some(io::ErrorKind::PermissionDenied));

        let missing = MockConnector::missing();
        assert!(matches!(
            missing.connect("/dev/ttyUSB9", &config),
            Err(PortError::NotFound(_))
        ));
    }
}
