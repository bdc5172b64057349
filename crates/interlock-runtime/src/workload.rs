//! Simulated computation latency.
//!
//! Stands in for real work done while a loop holds (or, in the defective
//! [`LockScope::Field`][crate::config::LockScope::Field] layout, does not
//! hold) the Guard.  The scheduler may preempt the thread anywhere in here;
//! the periodic yield makes that more likely on a lightly loaded machine.

use std::hint;
use std::thread;

/// Yield to the scheduler once every this many iterations.
const YIELD_EVERY: u32 = 256;

/// Spin for `iterations` steps, yielding periodically.
pub fn busy_work(iterations: u32) {
    for i in 0..iterations {
        hint::spin_loop();
        if i % YIELD_EVERY == 0 {
            thread::yield_now();
        }
    }
    hint::black_box(iterations);
}
