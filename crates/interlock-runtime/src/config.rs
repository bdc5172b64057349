//! Tuning knobs and policies for the three control loops.
//!
//! Durations and workload sizes are tuning, not semantics.  The enums are
//! the behavioural choices; each has a production default and exists so a
//! test harness can pin the alternative.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How much of a command the operator and hardware loops cover with one
/// Guard acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockScope {
    /// The whole command is written or read inside one critical section.
    #[default]
    Command,
    /// Every field access takes its own critical section.  Reproduces the
    /// torn-read defect for regression tests; never use in production.
    Field,
}

/// What the operator loop does when the previous command is still unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishPolicy {
    /// Overwrite it.  A slow hardware loop simply misses commands.
    #[default]
    Overwrite,
    /// Skip this iteration and retry after the publish interval.
    AwaitConsumed,
}

/// What the hardware loop does with an atomically read photon command at
/// or above the high-intensity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsafeCombinationPolicy {
    /// Accept it and log a warning: the read was atomic, so mode and
    /// intensity are the operator's consistent intent.
    #[default]
    Warn,
    /// Treat it as fatal and trip the safety latch.
    Trip,
}

/// Configuration for [`Producer`][crate::producer::Producer].
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    /// Pause between two publish attempts.
    pub interval: Duration,
    /// Simulated work between writing the mode and writing the intensity.
    pub compute_work: u32,
    /// Simulated work between writing the intensity and marking ready.
    pub settle_work: u32,
    /// Stop after this many commands have been published.
    pub max_commands: Option<u64>,
    pub lock_scope: LockScope,
    pub publish_policy: PublishPolicy,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5),
            compute_work: 8_000,
            settle_work: 6_000,
            max_commands: None,
            lock_scope: LockScope::default(),
            publish_policy: PublishPolicy::default(),
        }
    }
}

/// Configuration for [`Consumer`][crate::consumer::Consumer].
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Pause after finding no ready command.
    pub idle_interval: Duration,
    /// Pause after consuming a command.
    pub poll_interval: Duration,
    /// Simulated work between reading the sequence and reading the mode.
    pub read_work: u32,
    /// Simulated work between reading the mode and reading the intensity.
    pub verify_work: u32,
    pub lock_scope: LockScope,
    pub unsafe_combination: UnsafeCombinationPolicy,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
            read_work: 10_000,
            verify_work: 9_000,
            lock_scope: LockScope::default(),
            unsafe_combination: UnsafeCombinationPolicy::default(),
        }
    }
}

/// Configuration for [`Monitor`][crate::monitor::Monitor].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Configuration bundle for [`ControlSystem`][crate::system::ControlSystem].
#[derive(Debug, Clone, Default)]
pub struct SystemConfig {
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub monitor: MonitorConfig,
}

impl SystemConfig {
    /// Apply `scope` to both the operator and hardware loops.
    pub fn with_lock_scope(mut self, scope: LockScope) -> Self {
        self.producer.lock_scope = scope;
        self.consumer.lock_scope = scope;
        self
    }
}
