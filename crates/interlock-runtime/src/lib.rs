//! `interlock-runtime` – The Control Loops
//!
//! Three independently scheduled loops that coordinate only through the
//! kernel's shared command record and safety latch.  No loop calls another.
//!
//! # Modules
//!
//! - [`producer`] – [`Producer`][producer::Producer]: the operator loop.
//!   Builds one command per iteration and publishes it through the Guard in
//!   a single critical section.
//! - [`consumer`] – [`Consumer`][consumer::Consumer]: the hardware loop.
//!   Reads and consumes ready commands, then verifies them; a violation
//!   trips the latch and ends the loop.
//! - [`monitor`] – [`Monitor`][monitor::Monitor]: reflects the latch onto
//!   the SAFE/UNSAFE [`Indicator`][interlock_hal::Indicator] and stops for
//!   good once UNSAFE has been driven.
//! - [`system`] – [`ControlSystem`][system::ControlSystem]: spawns the three
//!   loops on named OS threads and joins their reports.
//! - [`config`] – intervals, workloads and the behavioural policies
//!   ([`LockScope`], [`PublishPolicy`], [`UnsafeCombinationPolicy`]).
//! - [`context`] – [`LoopContext`]: the shared handles every loop receives.
//! - [`clock`] – [`Sleeper`]: the interval clock, swappable in tests.
//! - [`workload`] – [`busy_work`][workload::busy_work]: simulated
//!   computation latency with preemption points.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: installs the
//!   global `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Termination
//!
//! Every loop checks the latch first and a shutdown request second at the
//! top of each iteration.  A tripped latch is terminal: all three loops
//! exit and none restarts.

pub mod clock;
pub mod config;
pub mod consumer;
pub mod context;
pub mod monitor;
pub mod producer;
pub mod system;
pub mod telemetry;
pub mod workload;

#[cfg(test)]
mod testing;

pub use clock::{Sleeper, ThreadSleeper};
pub use config::{
    ConsumerConfig, LockScope, MonitorConfig, ProducerConfig, PublishPolicy, SystemConfig,
    UnsafeCombinationPolicy,
};
pub use consumer::{Consumer, ConsumerReport, Verdict};
pub use context::{LoopContext, LoopExit};
pub use monitor::{Monitor, MonitorReport};
pub use producer::{Producer, ProducerReport};
pub use system::{ControlSystem, RunningSystem, SystemReport};
pub use telemetry::{TracerProviderGuard, init_tracing};
