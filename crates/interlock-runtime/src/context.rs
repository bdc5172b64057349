//! [`LoopContext`] – the handles every control loop shares.

use std::sync::Arc;

use interlock_kernel::{CommandGuard, SafetyLatch, ShutdownSignal};
use interlock_middleware::EventSink;

use crate::clock::{Sleeper, ThreadSleeper};

/// Why a control loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The safety latch tripped.  Terminal.
    Tripped,
    /// An operator requested shutdown.
    Shutdown,
    /// The loop finished its configured amount of work.
    Completed,
}

/// Shared state and collaborators handed to each loop.
///
/// Cloning is cheap; every clone refers to the same Guard, latch, shutdown
/// flag, sink and clock.
#[derive(Clone)]
pub struct LoopContext {
    pub guard: Arc<CommandGuard>,
    pub latch: Arc<SafetyLatch>,
    pub shutdown: ShutdownSignal,
    pub sink: Arc<dyn EventSink>,
    pub sleeper: Arc<dyn Sleeper>,
}

impl LoopContext {
    /// Fresh Guard, latch and shutdown flag, sleeping on the OS clock.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            guard: Arc::new(CommandGuard::new()),
            latch: Arc::new(SafetyLatch::new()),
            shutdown: ShutdownSignal::new(),
            sink,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// The exit a loop must take right now, if any.  A tripped latch wins
    /// over a shutdown request.
    pub fn stop_reason(&self) -> Option<LoopExit> {
        if self.latch.is_tripped() {
            Some(LoopExit::Tripped)
        } else if self.shutdown.is_requested() {
            Some(LoopExit::Shutdown)
        } else {
            None
        }
    }
}
