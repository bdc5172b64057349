//! [`Sleeper`] – the clock the loops use for their fixed intervals.

use std::thread;
use std::time::Duration;

/// Suspends the calling loop between iterations.
pub trait Sleeper: Send + Sync {
    fn sleep_for(&self, duration: Duration);
}

/// Sleeps the OS thread.  A zero duration yields instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep_for(&self, duration: Duration) {
        if duration.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(duration);
        }
    }
}
