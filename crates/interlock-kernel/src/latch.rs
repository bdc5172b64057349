//! [`SafetyLatch`] – one-way fail-safe trip flag.
//!
//! The latch starts [`LatchState::Ok`] and moves to
//! [`LatchState::Tripped`] the first time any thread calls
//! [`SafetyLatch::trip`].  There is no reset.  Reads are lock-free; a stale
//! read only delays a reaction by one poll, since the value can only ever
//! move towards `Tripped`.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use interlock_types::ViolationKind;
use tracing::error;

/// Observable state of a [`SafetyLatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchState {
    Ok,
    Tripped,
}

/// Write-once-to-true flag recording that the system is permanently unsafe.
///
/// # Example
///
/// ```
/// use interlock_kernel::{LatchState, SafetyLatch};
/// use interlock_types::ViolationKind;
///
/// let latch = SafetyLatch::new();
/// assert_eq!(latch.state(), LatchState::Ok);
///
/// assert!(latch.trip(ViolationKind::TornRead));
/// assert!(!latch.trip(ViolationKind::UnsafeCombination)); // already tripped
///
/// assert_eq!(latch.state(), LatchState::Tripped);
/// assert_eq!(latch.cause(), Some(ViolationKind::TornRead));
/// ```
#[derive(Debug, Default)]
pub struct SafetyLatch {
    tripped: AtomicBool,
    cause: OnceLock<ViolationKind>,
}

impl SafetyLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch.
    ///
    /// Returns `true` for the call that performed the transition and `false`
    /// for every later call.  Only the first recorded cause is kept.
    pub fn trip(&self, cause: ViolationKind) -> bool {
        // The cause cell picks the winner; the flag is raised after it, so
        // `is_tripped` implies a recorded cause.
        let first = self.cause.set(cause).is_ok();
        self.tripped.store(true, Ordering::SeqCst);
        if first {
            error!(%cause, "safety latch tripped");
        }
        first
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> LatchState {
        if self.is_tripped() {
            LatchState::Tripped
        } else {
            LatchState::Ok
        }
    }

    /// The violation that tripped the latch, `None` while it is still OK.
    pub fn cause(&self) -> Option<ViolationKind> {
        if self.is_tripped() {
            self.cause.get().copied()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn fresh_latch_is_ok() {
        let latch = SafetyLatch::new();
        assert!(!latch.is_tripped());
        assert_eq!(latch.state(), LatchState::Ok);
        assert_eq!(latch.cause(), None);
    }

    #[test]
    fn trip_is_permanent() {
        let latch = SafetyLatch::new();
        latch.trip(ViolationKind::FieldMismatch);
        for _ in 0..100 {
            assert!(latch.is_tripped());
        }
        assert_eq!(latch.cause(), Some(ViolationKind::FieldMismatch));
    }

    #[test]
    fn exactly_one_concurrent_trip_wins() {
        let latch = Arc::new(SafetyLatch::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let latch = Arc::clone(&latch);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if latch.trip(ViolationKind::TornRead) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(latch.is_tripped());
    }

    #[test]
    fn winning_trip_cause_is_the_recorded_cause() {
        let causes = [
            ViolationKind::TornRead,
            ViolationKind::FieldMismatch,
            ViolationKind::UnsafeCombination,
        ];
        for _ in 0..50 {
            let latch = Arc::new(SafetyLatch::new());
            let handles: Vec<_> = (0..6)
                .map(|i| {
                    let latch = Arc::clone(&latch);
                    let cause = causes[i % causes.len()];
                    thread::spawn(move || latch.trip(cause).then_some(cause))
                })
                .collect();
            let winners: Vec<ViolationKind> = handles
                .into_iter()
                .filter_map(|h| h.join().unwrap())
                .collect();

            assert_eq!(winners.len(), 1);
            assert_eq!(latch.cause(), Some(winners[0]));
        }
    }

    #[test]
    fn observers_never_see_latch_return_to_ok() {
        let latch = Arc::new(SafetyLatch::new());

        let observers: Vec<_> = (0..4)
            .map(|_| {
                let latch = Arc::clone(&latch);
                thread::spawn(move || {
                    let mut seen_tripped = false;
                    for _ in 0..50_000 {
                        let now = latch.is_tripped();
                        assert!(!(seen_tripped && !now), "latch went back to OK");
                        seen_tripped |= now;
                    }
                })
            })
            .collect();

        thread::yield_now();
        latch.trip(ViolationKind::TornRead);

        for o in observers {
            o.join().unwrap();
        }
        assert!(latch.is_tripped());
    }
}
