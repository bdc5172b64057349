//! [`Consumer`] – the hardware loop.
//!
//! Waits for a ready command, reads it inside one critical section, clears
//! `ready`, then checks the reading against a [`ReadingVerifier`] outside
//! the Guard.  Any violation trips the [`SafetyLatch`] and ends the loop;
//! an unsafe combination may instead be accepted with a warning, depending
//! on [`UnsafeCombinationPolicy`].
//!
//! [`SafetyLatch`]: interlock_kernel::SafetyLatch

use tracing::{info, warn};

use interlock_kernel::ReadingVerifier;
use interlock_middleware::Recorder;
use interlock_types::{CommandReading, EventPayload, InterlockError, ViolationKind};

use crate::config::{ConsumerConfig, LockScope, UnsafeCombinationPolicy};
use crate::context::{LoopContext, LoopExit};
use crate::workload::busy_work;

const SOURCE: &str = "interlock-runtime::consumer";

/// Outcome of evaluating a reading that did not trip the latch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// A high-intensity photon command accepted under
    /// [`UnsafeCombinationPolicy::Warn`].
    AcceptedWithWarning,
}

/// Summary returned when the hardware loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerReport {
    /// Commands read and cleared.
    pub consumed: u64,
    /// Readings accepted with a warning.
    pub warnings: u64,
    /// `seq_after` of the last reading, `0` if none.
    pub last_sequence: u64,
    pub exit: LoopExit,
    /// The violation that tripped the latch, when this loop tripped it.
    pub violation: Option<InterlockError>,
}

/// The hardware loop.
pub struct Consumer {
    ctx: LoopContext,
    config: ConsumerConfig,
    verifier: ReadingVerifier,
    recorder: Recorder,
    consumed: u64,
    warnings: u64,
    last_sequence: u64,
}

impl Consumer {
    /// A consumer checking readings with [`ReadingVerifier::standard`].
    pub fn new(ctx: LoopContext, config: ConsumerConfig) -> Self {
        let recorder = Recorder::new(SOURCE, ctx.sink.clone());
        Self {
            ctx,
            config,
            verifier: ReadingVerifier::standard(),
            recorder,
            consumed: 0,
            warnings: 0,
            last_sequence: 0,
        }
    }

    /// Replace the rule set.
    pub fn with_verifier(mut self, verifier: ReadingVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Read and consume the pending command, if any.
    ///
    /// Returns `None` when nothing is ready.  Otherwise the command has been
    /// marked consumed and the values observed are returned.
    pub fn poll(&mut self) -> Option<CommandReading> {
        let reading = match self.config.lock_scope {
            LockScope::Command => self.read_guarded(),
            LockScope::Field => self.read_per_field(),
        }?;
        self.consumed += 1;
        self.last_sequence = reading.seq_after;
        self.recorder.record(EventPayload::CommandConsumed(reading));
        Some(reading)
    }

    /// Apply the verifier and the unsafe-combination policy to `reading`.
    ///
    /// Every rule runs.  A tolerated unsafe combination never hides a later
    /// rule's violation.
    ///
    /// # Errors
    ///
    /// Returns the first violation, in rule order, that must trip the latch.
    pub fn evaluate(&self, reading: &CommandReading) -> Result<Verdict, InterlockError> {
        let tolerate = self.config.unsafe_combination == UnsafeCombinationPolicy::Warn;
        let mut verdict = Verdict::Accepted;
        for violation in self.verifier.violations(reading) {
            match violation {
                InterlockError::UnsafeCombination { .. } if tolerate => {
                    verdict = Verdict::AcceptedWithWarning;
                }
                e => return Err(e),
            }
        }
        Ok(verdict)
    }

    /// Run until the latch trips or shutdown is requested.
    pub fn run(mut self) -> ConsumerReport {
        info!(
            scope = ?self.config.lock_scope,
            policy = ?self.config.unsafe_combination,
            "hardware loop started"
        );
        let mut violation = None;
        let exit = loop {
            if let Some(exit) = self.ctx.stop_reason() {
                break exit;
            }
            let Some(reading) = self.poll() else {
                self.ctx.sleeper.sleep_for(self.config.idle_interval);
                continue;
            };

            match self.evaluate(&reading) {
                Ok(Verdict::Accepted) => {}
                Ok(Verdict::AcceptedWithWarning) => {
                    self.warnings += 1;
                    self.recorder
                        .record(EventPayload::HighIntensityAccepted(reading));
                }
                Err(e) => {
                    self.trip(&reading, &e);
                    violation = Some(e);
                    break LoopExit::Tripped;
                }
            }
            self.ctx.sleeper.sleep_for(self.config.poll_interval);
        };

        let report = ConsumerReport {
            consumed: self.consumed,
            warnings: self.warnings,
            last_sequence: self.last_sequence,
            exit,
            violation,
        };
        info!(
            consumed = report.consumed,
            warnings = report.warnings,
            exit = ?report.exit,
            "hardware loop stopped"
        );
        report
    }

    /// Trip first so the other loops stop as early as possible, then record.
    fn trip(&self, reading: &CommandReading, err: &InterlockError) {
        // Custom rules may return plumbing errors; those count as a policy
        // mismatch.
        let kind = err.violation_kind().unwrap_or(ViolationKind::FieldMismatch);
        if !self.ctx.latch.trip(kind) {
            warn!(%kind, "latch was already tripped");
        }
        self.recorder.record(EventPayload::Violation {
            kind,
            reading: *reading,
            message: err.to_string(),
        });
    }

    /// One critical section for the whole read, including the clear.
    fn read_guarded(&self) -> Option<CommandReading> {
        let mut session = self.ctx.guard.acquire();
        if !session.is_ready() {
            return None;
        }
        let seq_before = session.sequence();
        busy_work(self.config.read_work);
        let mode = session.mode();
        busy_work(self.config.verify_work);
        let intensity = session.intensity();
        let seq_after = session.sequence();
        session.clear_ready();
        session.release();

        Some(CommandReading {
            seq_before,
            seq_after,
            mode,
            intensity,
        })
    }

    /// One critical section per field read.
    fn read_per_field(&self) -> Option<CommandReading> {
        let guard = &self.ctx.guard;
        if !guard.acquire().is_ready() {
            return None;
        }
        let seq_before = guard.acquire().sequence();
        busy_work(self.config.read_work);
        let mode = guard.acquire().mode();
        busy_work(self.config.verify_work);
        let intensity = guard.acquire().intensity();
        let seq_after = guard.acquire().sequence();
        guard.acquire().clear_ready();

        Some(CommandReading {
            seq_before,
            seq_after,
            mode,
            intensity,
        })
    }
}
