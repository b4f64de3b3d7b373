//! What an operator sees in the log for typical runs.

mod common;

use common::{probe_config, test_clock};
use rs485_probe::port::{MockConnector, MockSerialPort, WriteBehavior};
use rs485_probe::PhaseRunner;
use std::io;
use std::time::Duration;
use tracing_test::traced_test;

#[test]
#[traced_test]
fn logs_hex_of_every_sent_frame() {
    let mut runner = PhaseRunner::new(test_clock());
    runner.run_sequence(
        &MockConnector::new(MockSerialPort::new("MOCK0")),
        &probe_config(1, Duration::ZERO),
    );

    assert!(logs_contain("Attempting to connect to MOCK0"));
    assert!(logs_contain("Configuration: 9600 baud, 8N1"));
    assert!(logs_contain("Successfully connected to MOCK0"));
    assert!(logs_contain("Sending Off-line Query: aa55807f00000001fe"));
    assert!(logs_contain("Sending Remove Register: aa55807f0002000200"));
    assert!(logs_contain("Successfully sent 9 bytes"));
    assert!(logs_contain("PHASE 3: Off-line Query (Repeated) Data Test"));
    assert!(logs_contain("Serial connection closed"));
    assert!(logs_contain("Total: 3/3 successful"));
}

#[test]
#[traced_test]
fn logs_replies_in_hex() {
    let mut port = MockSerialPort::new("MOCK0");
    port.queue_reply(&[0xaa, 0x55, 0x7f, 0x80]);
    let mut runner = PhaseRunner::new(test_clock());

    runner.run_sequence(&MockConnector::new(port), &probe_config(1, Duration::ZERO));

    assert!(logs_contain("Received response (4 bytes): aa557f80"));
    assert!(logs_contain("No response received"));
}

#[test]
#[traced_test]
fn failed_attempt_names_phase_attempt_and_packet() {
    let mut port = MockSerialPort::new("MOCK0");
    port.script_write(2, WriteBehavior::Short(4));
    let mut runner = PhaseRunner::new(test_clock());

    runner.run_sequence(&MockConnector::new(port), &probe_config(1, Duration::ZERO));

    assert!(logs_contain(
        "Phase 2 (Remove Register) attempt 1 sending Remove Register failed"
    ));
    assert!(logs_contain("Sent 4/9 bytes"));
    assert!(logs_contain("Transmission 1 failed (Remove Register)"));
    assert!(logs_contain("Phase 2 (Remove Register): 0/1 successful"));
}

#[test]
#[traced_test]
fn connection_failure_is_logged_with_port() {
    let mut runner = PhaseRunner::new(test_clock());
    let report = runner.run_sequence(
        &MockConnector::failing(io::ErrorKind::PermissionDenied),
        &probe_config(5, Duration::from_secs(2)),
    );

    assert!(report.fatal_error().is_some());
    assert!(logs_contain("Failed to connect to MOCK0"));
    assert!(!logs_contain("PHASE 1"));
    assert!(!logs_contain("Serial connection closed"));
}
