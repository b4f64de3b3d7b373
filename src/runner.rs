//! Phased transmission loop.
//!
//! The runner opens a session, sends each phase's packet `repeat_count`
//! times, and tallies what happened. Per-attempt failures are recorded and
//! the sweep keeps going; only a failed open stops a run.

use crate::clock::Clock;
use crate::config::ProbeConfig;
use crate::error::TransmissionError;
use crate::packet::{Packet, OFFLINE_QUERY, REMOVE_REGISTER};
use crate::port::{Connector, SerialPortAdapter};
use crate::report::{PhaseSummary, SessionReport, TransmissionResult};
use crate::session::SerialSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const RULE: &str = "============================================================";

/// One block of the test plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSpec {
    pub name: &'static str,
    pub packet: Packet,
}

/// Probe, remove the register, probe again.
///
/// The first and third phases are intentionally the same so the operator
/// can compare inverter behaviour before and after the removal.
pub const TEST_PLAN: [PhaseSpec; 3] = [
    PhaseSpec {
        name: "Off-line Query",
        packet: OFFLINE_QUERY,
    },
    PhaseSpec {
        name: "Remove Register",
        packet: REMOVE_REGISTER,
    },
    PhaseSpec {
        name: "Off-line Query (Repeated)",
        packet: OFFLINE_QUERY,
    },
];

/// Drives phases over a session and keeps the inter-attempt pacing.
#[derive(Debug)]
pub struct PhaseRunner<K: Clock> {
    clock: K,
    interrupt: Arc<AtomicBool>,
    response_timeout: Option<Duration>,
    attempts_made: usize,
}

impl<K: Clock> PhaseRunner<K> {
    pub fn new(clock: K) -> Self {
        Self {
            clock,
            interrupt: Arc::new(AtomicBool::new(false)),
            response_timeout: Some(Duration::from_secs(2)),
            attempts_made: 0,
        }
    }

    /// Stop before the next attempt once `flag` becomes true.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Reply wait after each good send; `None` skips reading entirely.
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Send `packet` `repeat_count` times and summarise the outcomes.
    ///
    /// `interval` separates this phase's first attempt from whatever attempt
    /// this runner made before it, so consecutive phases are paced the same
    /// way as attempts inside a phase and nothing trails the last attempt.
    pub fn run_phase<P: SerialPortAdapter>(
        &mut self,
        number: usize,
        name: &str,
        packet: &Packet,
        repeat_count: u32,
        interval: Duration,
        session: &mut SerialSession<P>,
    ) -> PhaseSummary {
        info!("{}", RULE);
        info!("PHASE {}: {} Data Test", number, name);
        info!("{}", RULE);
        info!("Starting {} test sequence", name);
        info!(
            "Will send packet {} times with {:.1}s intervals",
            repeat_count,
            interval.as_secs_f64()
        );

        let started_at = self.clock.now();
        let mut results = Vec::with_capacity(repeat_count as usize);

        for attempt in 1..=repeat_count {
            if self.interrupted() {
                break;
            }
            if self.attempts_made > 0 {
                debug!(
                    "Waiting {:.1} seconds before next transmission",
                    interval.as_secs_f64()
                );
                self.clock.sleep(interval);
                if self.interrupted() {
                    break;
                }
            }
            self.attempts_made += 1;

            info!("Transmission {}/{}", attempt, repeat_count);
            let result = self.attempt(number, name, packet, attempt, session);
            if result.is_success() {
                info!("Transmission {} successful", attempt);
            } else {
                warn!("Transmission {} failed ({})", attempt, result.packet_name());
            }
            results.push(result);
        }

        let summary = PhaseSummary::new(number, name, results, started_at, self.clock.now());
        info!(
            "Completed {} test sequence: {}/{} successful",
            name,
            summary.successes(),
            summary.attempts()
        );
        summary
    }

    fn attempt<P: SerialPortAdapter>(
        &self,
        phase: usize,
        phase_name: &str,
        packet: &Packet,
        attempt: u32,
        session: &mut SerialSession<P>,
    ) -> TransmissionResult {
        let written = match session.send(packet) {
            Ok(written) => written,
            Err(err) => {
                error!(
                    phase,
                    attempt,
                    packet = packet.name(),
                    "Phase {} ({}) attempt {} sending {} failed: {}",
                    phase,
                    phase_name,
                    attempt,
                    packet.name(),
                    err
                );
                let written = match err {
                    TransmissionError::ShortWrite { written, .. } => written,
                    _ => 0,
                };
                return TransmissionResult::new(
                    packet,
                    attempt,
                    written,
                    Vec::new(),
                    Some(err.to_string()),
                );
            }
        };

        let Some(timeout) = self.response_timeout else {
            return TransmissionResult::new(packet, attempt, written, Vec::new(), None);
        };

        match session.receive(timeout) {
            Ok(response) => TransmissionResult::new(packet, attempt, written, response, None),
            Err(err) => {
                error!(
                    phase,
                    attempt,
                    packet = packet.name(),
                    "Phase {} ({}) attempt {}: reading reply to {} failed: {}",
                    phase,
                    phase_name,
                    attempt,
                    packet.name(),
                    err
                );
                TransmissionResult::new(
                    packet,
                    attempt,
                    written,
                    Vec::new(),
                    Some(format!("receive: {err}")),
                )
            }
        }
    }

    /// Open the configured port and run the full test plan on it.
    ///
    /// A failed open yields a report with no phases and the connection
    /// error; nothing is sent and no time is spent waiting.
    pub fn run_sequence<C: Connector>(
        &mut self,
        connector: &C,
        config: &ProbeConfig,
    ) -> SessionReport {
        self.run_plan(connector, config, &TEST_PLAN)
    }

    /// Same as [`run_sequence`](Self::run_sequence) over an explicit plan.
    pub fn run_plan<C: Connector>(
        &mut self,
        connector: &C,
        config: &ProbeConfig,
        plan: &[PhaseSpec],
    ) -> SessionReport {
        self.response_timeout = config.await_response().then(|| config.timeout());

        info!("{}", RULE);
        info!("Starting RS485 Communication Test");
        info!(
            "Test started at: {}",
            self.clock.now().with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        );
        info!("{}", RULE);

        let mut session = match SerialSession::open(connector, config) {
            Ok(session) => session,
            Err(err) => {
                error!("{}", err);
                let report = SessionReport::aborted(err, self.clock.now());
                log_report(&report);
                return report;
            }
        };

        let started_at = self.clock.now();
        let mut phases = Vec::with_capacity(plan.len());

        for (index, spec) in plan.iter().enumerate() {
            if self.interrupted() {
                break;
            }
            phases.push(self.run_phase(
                index + 1,
                spec.name,
                &spec.packet,
                config.repeat_count(),
                config.interval(),
                &mut session,
            ));
        }

        let interrupted = self.interrupted();
        if interrupted {
            warn!("Test interrupted by user");
        }
        session.close();

        let report = SessionReport::new(phases, started_at, self.clock.now(), interrupted);
        log_report(&report);
        report
    }
}

fn log_report(report: &SessionReport) {
    for line in report.to_string().lines() {
        info!("{}", line);
    }
}
