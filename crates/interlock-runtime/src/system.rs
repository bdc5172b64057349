//! [`ControlSystem`] – spawns the three loops on their own OS threads.
//!
//! The loops never call each other.  They share one [`CommandGuard`], one
//! [`SafetyLatch`] and one [`ShutdownSignal`] through a [`LoopContext`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use interlock_hal::SimIndicator;
//! use interlock_middleware::TracingSink;
//! use interlock_runtime::{ControlSystem, SystemConfig};
//!
//! let (indicator, _probe) = SimIndicator::new();
//! let running = ControlSystem::new(SystemConfig::default())
//!     .start(indicator, Arc::new(TracingSink))
//!     .expect("spawn loops");
//!
//! running.wait_for_trip(Duration::from_secs(1));
//! running.request_shutdown();
//! let report = running.join().expect("loops exited cleanly");
//! println!("published {}", report.producer.published);
//! ```
//!
//! [`CommandGuard`]: interlock_kernel::CommandGuard

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{error, info};

use interlock_hal::Indicator;
use interlock_kernel::{SafetyLatch, ShutdownSignal};
use interlock_middleware::EventSink;
use interlock_types::{InterlockError, ViolationKind};

use crate::clock::{Sleeper, ThreadSleeper};
use crate::config::SystemConfig;
use crate::consumer::{Consumer, ConsumerReport};
use crate::context::LoopContext;
use crate::monitor::{Monitor, MonitorReport};
use crate::producer::{Producer, ProducerReport};

/// How often [`RunningSystem::wait_for_trip`] polls the latch.
const WAIT_POLL: Duration = Duration::from_millis(1);

/// Reports from all three loops plus the latch's trip cause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemReport {
    pub producer: ProducerReport,
    pub consumer: ConsumerReport,
    pub monitor: MonitorReport,
    /// `None` when the latch never tripped.
    pub cause: Option<ViolationKind>,
}

/// Builder for a running control system.
pub struct ControlSystem {
    config: SystemConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl ControlSystem {
    pub fn new(config: SystemConfig) -> Self {
        Self {
            config,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Use `sleeper` for every loop's fixed intervals.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Spawn the monitor, consumer and producer threads, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::Thread`] if a thread cannot be spawned.
    /// Loops that were already running are asked to shut down.
    pub fn start(
        self,
        indicator: Box<dyn Indicator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<RunningSystem, InterlockError> {
        let ctx = LoopContext::new(sink).with_sleeper(self.sleeper);
        let SystemConfig {
            producer,
            consumer,
            monitor,
        } = self.config;

        let monitor = Monitor::new(ctx.clone(), monitor, indicator);
        let monitor = spawn_loop("monitor", &ctx, move || monitor.run())?;

        let consumer = Consumer::new(ctx.clone(), consumer);
        let consumer = spawn_loop("consumer", &ctx, move || consumer.run())?;

        let producer = Producer::new(ctx.clone(), producer);
        let producer = spawn_loop("producer", &ctx, move || producer.run())?;

        info!("control loops running");
        Ok(RunningSystem {
            ctx,
            producer,
            consumer,
            monitor,
        })
    }
}

/// Handles to the three running loops.
pub struct RunningSystem {
    ctx: LoopContext,
    producer: JoinHandle<ProducerReport>,
    consumer: JoinHandle<ConsumerReport>,
    monitor: JoinHandle<MonitorReport>,
}

impl RunningSystem {
    pub fn latch(&self) -> &Arc<SafetyLatch> {
        &self.ctx.latch
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.ctx.shutdown.clone()
    }

    /// Ask every loop to stop at its next check.  Does not trip the latch.
    pub fn request_shutdown(&self) {
        self.ctx.shutdown.request();
    }

    /// Block until the latch trips, shutdown is requested or `timeout`
    /// elapses.  Returns whether the latch has tripped.
    pub fn wait_for_trip(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        while self.ctx.stop_reason().is_none() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            thread::sleep(WAIT_POLL);
        }
        self.ctx.latch.is_tripped()
    }

    /// Wait for all three loops to exit.
    ///
    /// Blocks until the latch trips or shutdown is requested (or the
    /// producer completes and one of those follows).
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::Thread`] if a loop panicked.  A panicking
    /// loop requests shutdown as it unwinds, so the remaining loops still
    /// exit.
    pub fn join(self) -> Result<SystemReport, InterlockError> {
        let shutdown = &self.ctx.shutdown;
        let producer = join_loop("producer", self.producer, shutdown);
        let consumer = join_loop("consumer", self.consumer, shutdown);
        let monitor = join_loop("monitor", self.monitor, shutdown);

        Ok(SystemReport {
            producer: producer?,
            consumer: consumer?,
            monitor: monitor?,
            cause: self.ctx.latch.cause(),
        })
    }
}

/// Requests shutdown if the loop thread unwinds, so the surviving loops
/// exit and [`RunningSystem::join`] returns.
struct StopOnPanic {
    name: &'static str,
    shutdown: ShutdownSignal,
}

impl Drop for StopOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            error!(thread = self.name, "loop panicked; stopping the other loops");
            self.shutdown.request();
        }
    }
}

fn spawn_loop<T, F>(
    name: &'static str,
    ctx: &LoopContext,
    body: F,
) -> Result<JoinHandle<T>, InterlockError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let stop = StopOnPanic {
        name,
        shutdown: ctx.shutdown.clone(),
    };
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let _stop = stop;
            body()
        })
        .map_err(|e| {
            ctx.shutdown.request();
            error!(thread = name, "spawn failed: {e}");
            InterlockError::Thread(format!("failed to spawn {name} loop: {e}"))
        })
}

fn join_loop<T>(
    name: &str,
    handle: JoinHandle<T>,
    shutdown: &ShutdownSignal,
) -> Result<T, InterlockError> {
    handle.join().map_err(|_| {
        shutdown.request();
        error!(thread = name, "loop panicked");
        InterlockError::Thread(format!("{name} loop panicked"))
    })
}
