//! Results produced by a diagnostic run.
//!
//! Everything here is built by the phase runner and read-only afterwards.

use crate::error::ConnectionError;
use crate::packet::Packet;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

const RULE: &str = "============================================================";

/// Outcome of one send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionResult {
    packet_name: &'static str,
    attempt: u32,
    bytes_written: usize,
    expected_len: usize,
    response: Vec<u8>,
    error: Option<String>,
}

impl TransmissionResult {
    /// Record an attempt. `attempt` is 1-based within its phase.
    pub fn new(
        packet: &Packet,
        attempt: u32,
        bytes_written: usize,
        response: Vec<u8>,
        error: Option<String>,
    ) -> Self {
        Self {
            packet_name: packet.name(),
            attempt,
            bytes_written,
            expected_len: packet.len(),
            response,
            error,
        }
    }

    pub fn packet_name(&self) -> &'static str {
        self.packet_name
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// True exactly when the whole packet went out.
    pub fn is_success(&self) -> bool {
        self.bytes_written == self.expected_len
    }

    /// Bytes read back after the send, possibly none.
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    /// What went wrong, if anything; a failed receive after a good send
    /// lands here without affecting `is_success`.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// All attempts of one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSummary {
    number: usize,
    name: String,
    results: Vec<TransmissionResult>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

impl PhaseSummary {
    pub fn new(
        number: usize,
        name: impl Into<String>,
        results: Vec<TransmissionResult>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number,
            name: name.into(),
            results,
            started_at,
            finished_at,
        }
    }

    /// 1-based position in the sequence.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn results(&self) -> &[TransmissionResult] {
        &self.results
    }

    pub fn attempts(&self) -> usize {
        self.results.len()
    }

    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.attempts() - self.successes()
    }

    /// Attempt indices that did not go through.
    pub fn failed_attempts(&self) -> Vec<u32> {
        self.results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.attempt())
            .collect()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }
}

/// The whole run: phases in order plus totals.
#[derive(Debug)]
pub struct SessionReport {
    phases: Vec<PhaseSummary>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    fatal: Option<ConnectionError>,
    interrupted: bool,
}

impl SessionReport {
    pub(crate) fn new(
        phases: Vec<PhaseSummary>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        interrupted: bool,
    ) -> Self {
        Self {
            phases,
            started_at,
            finished_at,
            fatal: None,
            interrupted,
        }
    }

    /// A run that never got a session.
    pub(crate) fn aborted(error: ConnectionError, at: DateTime<Utc>) -> Self {
        Self {
            phases: Vec::new(),
            started_at: at,
            finished_at: at,
            fatal: Some(error),
            interrupted: false,
        }
    }

    pub fn phases(&self) -> &[PhaseSummary] {
        &self.phases
    }

    pub fn successes(&self) -> usize {
        self.phases.iter().map(PhaseSummary::successes).sum()
    }

    pub fn failures(&self) -> usize {
        self.phases.iter().map(PhaseSummary::failures).sum()
    }

    pub fn attempts(&self) -> usize {
        self.phases.iter().map(PhaseSummary::attempts).sum()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Wall time from start to finish.
    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// The connection failure that stopped the run before any phase.
    pub fn fatal_error(&self) -> Option<&ConnectionError> {
        self.fatal.as_ref()
    }

    pub fn into_fatal_error(self) -> Option<ConnectionError> {
        self.fatal
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Every planned phase ran to the end.
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none() && !self.interrupted
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{RULE}")?;
        writeln!(f, "TEST SUMMARY")?;
        writeln!(f, "{RULE}")?;

        if let Some(err) = &self.fatal {
            return writeln!(f, "Run aborted: {err}");
        }

        for phase in &self.phases {
            writeln!(
                f,
                "Phase {} ({}): {}/{} successful",
                phase.number(),
                phase.name(),
                phase.successes(),
                phase.attempts()
            )?;
        }
        writeln!(f, "Total: {}/{} successful", self.successes(), self.attempts())?;
        writeln!(f, "Duration: {:.1}s", self.duration().as_secs_f64())?;

        if self.interrupted {
            writeln!(f, "Run interrupted by user")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{OFFLINE_QUERY, REMOVE_REGISTER};
    use crate::port::PortError;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::seconds(secs)
    }

    #[test]
    fn test_success_tracks_written_length() {
        let full = TransmissionResult::new(&OFFLINE_QUERY, 1, 9, Vec::new(), None);
        let short = TransmissionResult::new(&OFFLINE_QUERY, 2, 3, Vec::new(), Some("short".into()));
        let receive_failed =
            TransmissionResult::new(&OFFLINE_QUERY, 3, 9, Vec::new(), Some("read".into()));

        assert!(full.is_success());
        assert!(!short.is_success());
        assert!(receive_failed.is_success());
    }

    #[test]
    fn test_phase_counts() {
        let results = vec![
            TransmissionResult::new(&REMOVE_REGISTER, 1, 9, vec![0x01], None),
            TransmissionResult::new(&REMOVE_REGISTER, 2, 0, Vec::new(), Some("io".into())),
            TransmissionResult::new(&REMOVE_REGISTER, 3, 9, Vec::new(), None),
        ];
        let phase = PhaseSummary::new(2, "Remove Register", results, at(0), at(4));

        assert_eq!(phase.attempts(), 3);
        assert_eq!(phase.successes(), 2);
        assert_eq!(phase.failures(), 1);
        assert_eq!(phase.failed_attempts(), vec![2]);
    }

    #[test]
    fn test_summary_rendering() {
        let ok = |n| TransmissionResult::new(&OFFLINE_QUERY, n, 9, Vec::new(), None);
        let phases = vec![
            PhaseSummary::new(1, "Off-line Query", vec![ok(1), ok(2)], at(0), at(2)),
            PhaseSummary::new(
                2,
                "Remove Register",
                vec![
                    TransmissionResult::new(&REMOVE_REGISTER, 1, 3, Vec::new(), None),
                    TransmissionResult::new(&REMOVE_REGISTER, 2, 9, Vec::new(), None),
                ],
                at(4),
                at(6),
            ),
        ];
        let report = SessionReport::new(phases, at(0), at(6), false);

        let expected = "\
============================================================
TEST SUMMARY
============================================================
Phase 1 (Off-line Query): 2/2 successful
Phase 2 (Remove Register): 1/2 successful
Total: 3/4 successful
Duration: 6.0s
";
        assert_eq!(report.to_string(), expected);
        assert!(report.is_complete());
        assert_eq!(report.failures(), 1);
    }

    #[test]
    fn test_aborted_report() {
        let err = ConnectionError::new("/dev/ttyUSB0", PortError::not_found("/dev/ttyUSB0"));
        let report = SessionReport::aborted(err, at(10));

        assert!(report.phases().is_empty());
        assert!(report.fatal_error().is_some());
        assert!(!report.is_complete());
        assert_eq!(report.duration(), Duration::ZERO);
        assert!(report.to_string().contains("Run aborted"));
    }
}
