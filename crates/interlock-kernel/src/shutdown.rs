//! [`ShutdownSignal`] – cooperative stop request for the control loops.
//!
//! Independent of the [`SafetyLatch`][crate::latch::SafetyLatch]: a shutdown
//! ends the loops without declaring the system unsafe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cloneable stop flag.  All clones observe the same request.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every loop holding a clone to stop at its next check.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_request() {
        let signal = ShutdownSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_requested());

        signal.request();
        assert!(clone.is_requested());
    }
}
