//! Shared fixtures for the runtime's unit and threaded tests.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use interlock_kernel::ShutdownSignal;
use interlock_middleware::EventSink;
use interlock_types::{Command, CommandReading, Event, EventPayload, IndicatorState};

use crate::clock::Sleeper;
use crate::config::SystemConfig;

/// Keeps every record it receives.
#[derive(Default)]
pub struct CaptureSink(Mutex<Vec<Event>>);

impl CaptureSink {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn published(&self) -> Vec<Command> {
        self.events()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::CommandPublished(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn consumed(&self) -> Vec<CommandReading> {
        self.events()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::CommandConsumed(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn indicator_changes(&self) -> Vec<IndicatorState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::IndicatorChanged(state) => Some(state),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CaptureSink {
    fn record(&self, event: Event) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Requests shutdown the first time a loop sleeps, so a single-threaded
/// test can drive exactly one iteration of a loop's `run`.
pub struct StopOnSleep(pub ShutdownSignal);

impl Sleeper for StopOnSleep {
    fn sleep_for(&self, _duration: Duration) {
        self.0.request();
    }
}

/// Sleeps a random fraction (up to twice) of the requested interval to
/// shake up the interleaving of the loops.  Seeded, so a failing schedule
/// can be replayed.
pub struct JitterSleeper(Mutex<StdRng>);

impl JitterSleeper {
    pub fn seeded(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl Sleeper for JitterSleeper {
    fn sleep_for(&self, duration: Duration) {
        let factor: f64 = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(0.0..=2.0);
        let scaled = duration.mul_f64(factor);
        if scaled.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(scaled);
        }
    }
}

/// Short intervals and small workloads so threaded tests finish quickly.
pub fn fast_config() -> SystemConfig {
    let mut cfg = SystemConfig::default();
    cfg.producer.interval = Duration::from_micros(200);
    cfg.producer.compute_work = 500;
    cfg.producer.settle_work = 500;
    cfg.consumer.idle_interval = Duration::from_micros(50);
    cfg.consumer.poll_interval = Duration::from_micros(50);
    cfg.consumer.read_work = 500;
    cfg.consumer.verify_work = 500;
    cfg.monitor.poll_interval = Duration::from_millis(1);
    cfg
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
