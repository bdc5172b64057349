//! [`Producer`] – the operator loop.
//!
//! Each iteration builds the next command and publishes it through the
//! Guard.  With [`LockScope::Command`] the whole build, simulated latency
//! included, happens inside one critical section: the consumer sees the
//! previous command or the new one, never a mixture.  Sequence parity picks
//! the mode, so adjacent commands always differ in both mode and intensity
//! and any mixture is detectable.

use tracing::{debug, info};

use interlock_middleware::Recorder;
use interlock_types::{Command, EventPayload, Mode};

use crate::config::{LockScope, ProducerConfig, PublishPolicy};
use crate::context::{LoopContext, LoopExit};
use crate::workload::busy_work;

const SOURCE: &str = "interlock-runtime::producer";

/// Summary returned when the operator loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerReport {
    /// Commands published.
    pub published: u64,
    /// Iterations skipped because the previous command was still unread.
    pub skipped: u64,
    /// Sequence of the last published command, `0` if none.
    pub last_sequence: u64,
    pub exit: LoopExit,
}

/// The operator loop.
pub struct Producer {
    ctx: LoopContext,
    config: ProducerConfig,
    recorder: Recorder,
    next_sequence: u64,
    published: u64,
    skipped: u64,
}

impl Producer {
    pub fn new(ctx: LoopContext, config: ProducerConfig) -> Self {
        let recorder = Recorder::new(SOURCE, ctx.sink.clone());
        Self {
            ctx,
            config,
            recorder,
            next_sequence: 1,
            published: 0,
            skipped: 0,
        }
    }

    /// Publish the next command and record it.
    ///
    /// Returns `None` without consuming a sequence number when
    /// [`PublishPolicy::AwaitConsumed`] is set and the previous command is
    /// still ready.
    pub fn publish_next(&mut self) -> Option<Command> {
        let sequence = self.next_sequence;
        let mode = Mode::for_sequence(sequence);

        let published = match self.config.lock_scope {
            LockScope::Command => self.publish_guarded(sequence, mode),
            LockScope::Field => self.publish_per_field(sequence, mode),
        };
        if !published {
            self.skipped += 1;
            debug!(seq = sequence, "previous command still pending; skipping");
            return None;
        }

        self.next_sequence += 1;
        self.published += 1;
        let cmd = Command {
            sequence,
            mode,
            intensity: mode.intensity(),
        };
        self.recorder.record(EventPayload::CommandPublished(cmd));
        Some(cmd)
    }

    /// Run until the latch trips, shutdown is requested or `max_commands`
    /// have been published.
    pub fn run(mut self) -> ProducerReport {
        info!(
            scope = ?self.config.lock_scope,
            policy = ?self.config.publish_policy,
            "operator loop started"
        );
        let exit = loop {
            if let Some(exit) = self.ctx.stop_reason() {
                break exit;
            }
            if self.finished() {
                break LoopExit::Completed;
            }
            self.publish_next();
            if self.finished() {
                break LoopExit::Completed;
            }
            self.ctx.sleeper.sleep_for(self.config.interval);
        };

        let report = ProducerReport {
            published: self.published,
            skipped: self.skipped,
            last_sequence: self.next_sequence - 1,
            exit,
        };
        info!(
            published = report.published,
            skipped = report.skipped,
            exit = ?report.exit,
            "operator loop stopped"
        );
        report
    }

    fn finished(&self) -> bool {
        self.config
            .max_commands
            .is_some_and(|max| self.published >= max)
    }

    fn must_wait(&self, ready: bool) -> bool {
        ready && self.config.publish_policy == PublishPolicy::AwaitConsumed
    }

    /// One critical section for the whole command.
    fn publish_guarded(&self, sequence: u64, mode: Mode) -> bool {
        let mut session = self.ctx.guard.acquire();
        if self.must_wait(session.is_ready()) {
            return false;
        }
        session.clear_ready();
        session.set_sequence(sequence);
        session.set_mode(mode);
        busy_work(self.config.compute_work);
        session.set_intensity(mode.intensity());
        busy_work(self.config.settle_work);
        session.mark_ready();
        session.release();
        true
    }

    /// One critical section per field write, leaving the record open to a
    /// concurrent reader between every step.
    fn publish_per_field(&self, sequence: u64, mode: Mode) -> bool {
        let guard = &self.ctx.guard;
        if self.must_wait(guard.acquire().is_ready()) {
            return false;
        }
        guard.acquire().set_sequence(sequence);
        guard.acquire().set_mode(mode);
        busy_work(self.config.compute_work);
        guard.acquire().set_intensity(mode.intensity());
        busy_work(self.config.settle_work);
        guard.acquire().mark_ready();
        true
    }
}
