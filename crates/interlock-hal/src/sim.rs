//! In-process simulated devices for headless runs and tests.
//!
//! [`SimRelay`] stands in for a GPIO output and can be built ready, not
//! ready, or faulty.  [`SimIndicator`] records every state it is driven to
//! and shares that record through an [`IndicatorProbe`], so a test can keep
//! watching the indicator after handing it to the monitor thread.
//!
//! # Example
//!
//! ```rust
//! use interlock_hal::{Indicator, SimIndicator};
//! use interlock_types::IndicatorState;
//!
//! let (mut indicator, probe) = SimIndicator::new();
//! indicator.set_safe().unwrap();
//! indicator.set_unsafe().unwrap();
//!
//! assert_eq!(probe.current(), Some(IndicatorState::Unsafe));
//! assert_eq!(probe.transitions(), vec![IndicatorState::Safe, IndicatorState::Unsafe]);
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use interlock_types::{IndicatorState, InterlockError};

use crate::indicator::Indicator;
use crate::relay::Relay;

// ────────────────────────────────────────────────────────────────────────────
// Stub relay
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayHealth {
    Ready,
    NotReady,
    /// Present, but fails whenever it is driven on.
    Faulty,
}

/// A simulated relay that records the current state.
pub struct SimRelay {
    id: String,
    state: bool,
    health: RelayHealth,
}

impl SimRelay {
    /// Create a healthy simulated relay with the given identifier.
    pub fn new(id: impl Into<String>) -> Box<Self> {
        Self::with_health(id, RelayHealth::Ready)
    }

    /// Create a relay whose device was never found.
    pub fn not_ready(id: impl Into<String>) -> Box<Self> {
        Self::with_health(id, RelayHealth::NotReady)
    }

    /// Create a relay that reports ready but fails to energise.
    pub fn faulty(id: impl Into<String>) -> Box<Self> {
        Self::with_health(id, RelayHealth::Faulty)
    }

    fn with_health(id: impl Into<String>, health: RelayHealth) -> Box<Self> {
        Box::new(Self {
            id: id.into(),
            state: false,
            health,
        })
    }
}

impl Relay for SimRelay {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_ready(&self) -> bool {
        self.health != RelayHealth::NotReady
    }

    fn set_state(&mut self, active: bool) -> Result<(), InterlockError> {
        if active && self.health == RelayHealth::Faulty {
            return Err(InterlockError::HardwareFault {
                component: self.id.clone(),
                details: "output stuck low".to_string(),
            });
        }
        self.state = active;
        Ok(())
    }

    fn state(&self) -> bool {
        self.state
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Recording indicator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Record {
    transitions: Vec<IndicatorState>,
    drives: usize,
}

/// A simulated indicator that records state transitions.
pub struct SimIndicator {
    record: Arc<Mutex<Record>>,
    state: IndicatorState,
}

impl SimIndicator {
    /// Create an indicator and the probe that observes it.
    ///
    /// The indicator reports [`IndicatorState::Safe`] until driven, but no
    /// transition is recorded before the first drive.
    pub fn new() -> (Box<Self>, IndicatorProbe) {
        let record = Arc::new(Mutex::new(Record::default()));
        let indicator = Box::new(Self {
            record: Arc::clone(&record),
            state: IndicatorState::Safe,
        });
        (indicator, IndicatorProbe { record })
    }

    fn drive(&mut self, state: IndicatorState) {
        let mut record = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        record.drives += 1;
        if record.transitions.last() != Some(&state) {
            record.transitions.push(state);
        }
        self.state = state;
    }
}

impl Indicator for SimIndicator {
    fn set_safe(&mut self) -> Result<(), InterlockError> {
        self.drive(IndicatorState::Safe);
        Ok(())
    }

    fn set_unsafe(&mut self) -> Result<(), InterlockError> {
        self.drive(IndicatorState::Unsafe);
        Ok(())
    }

    fn state(&self) -> IndicatorState {
        self.state
    }
}

/// Read-only view of a [`SimIndicator`]'s history.  Clone it freely.
#[derive(Clone)]
pub struct IndicatorProbe {
    record: Arc<Mutex<Record>>,
}

impl IndicatorProbe {
    /// The most recently driven state, or `None` if never driven.
    pub fn current(&self) -> Option<IndicatorState> {
        self.lock().transitions.last().copied()
    }

    /// Every distinct state the indicator passed through, in order.
    pub fn transitions(&self) -> Vec<IndicatorState> {
        self.lock().transitions.clone()
    }

    /// Total number of drive calls, including repeats of the same state.
    pub fn drives(&self) -> usize {
        self.lock().drives
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Record> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
