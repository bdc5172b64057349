//! [`Indicator`] – the external SAFE/UNSAFE signal.
//!
//! The monitor loop is the only writer.  Both operations are idempotent:
//! driving SAFE twice leaves the outputs exactly as driving it once.

use interlock_types::{IndicatorState, InterlockError};
use tracing::debug;

use crate::relay::Relay;

/// A binary safety indicator with two mutually exclusive signals.
pub trait Indicator: Send {
    /// Show SAFE (and clear UNSAFE).
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::HardwareFault`] if an output cannot be
    /// switched.
    fn set_safe(&mut self) -> Result<(), InterlockError>;

    /// Show UNSAFE (and clear SAFE).
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::HardwareFault`] if an output cannot be
    /// switched.
    fn set_unsafe(&mut self) -> Result<(), InterlockError>;

    /// The state most recently driven.
    fn state(&self) -> IndicatorState;
}

/// Drives a SAFE lamp and an UNSAFE lamp so that at most one is lit.
///
/// Each transition switches the outgoing lamp off before switching the
/// incoming lamp on.
///
/// # Example
///
/// ```
/// use interlock_hal::{Indicator, LampPair, SimRelay};
/// use interlock_types::IndicatorState;
///
/// let mut lamps = LampPair::new(SimRelay::new("led0"), SimRelay::new("led2"))
///     .expect("simulated relays are always ready");
/// assert_eq!(lamps.state(), IndicatorState::Safe);
///
/// lamps.set_unsafe().unwrap();
/// assert_eq!(lamps.state(), IndicatorState::Unsafe);
/// ```
pub struct LampPair {
    safe_lamp: Box<dyn Relay>,
    unsafe_lamp: Box<dyn Relay>,
    state: IndicatorState,
}

impl LampPair {
    /// Take ownership of both lamps and drive the initial SAFE state.
    ///
    /// # Errors
    ///
    /// - [`InterlockError::DeviceNotReady`] – either lamp reports
    ///   `is_ready() == false`.
    /// - [`InterlockError::HardwareFault`] – the initial SAFE state could not
    ///   be applied.
    pub fn new(
        safe_lamp: Box<dyn Relay>,
        unsafe_lamp: Box<dyn Relay>,
    ) -> Result<Self, InterlockError> {
        for lamp in [&safe_lamp, &unsafe_lamp] {
            if !lamp.is_ready() {
                return Err(InterlockError::DeviceNotReady(lamp.id().to_string()));
            }
        }

        let mut pair = Self {
            safe_lamp,
            unsafe_lamp,
            state: IndicatorState::Safe,
        };
        pair.set_safe()?;
        debug!(
            safe_lamp = pair.safe_lamp.id(),
            unsafe_lamp = pair.unsafe_lamp.id(),
            "indicator lamps configured"
        );
        Ok(pair)
    }

    /// Raw output levels as `(safe_lamp, unsafe_lamp)`.
    pub fn levels(&self) -> (bool, bool) {
        (self.safe_lamp.state(), self.unsafe_lamp.state())
    }
}

impl Indicator for LampPair {
    fn set_safe(&mut self) -> Result<(), InterlockError> {
        self.unsafe_lamp.set_state(false)?;
        self.safe_lamp.set_state(true)?;
        self.state = IndicatorState::Safe;
        Ok(())
    }

    fn set_unsafe(&mut self) -> Result<(), InterlockError> {
        self.safe_lamp.set_state(false)?;
        self.unsafe_lamp.set_state(true)?;
        self.state = IndicatorState::Unsafe;
        Ok(())
    }

    fn state(&self) -> IndicatorState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRelay;

    #[test]
    fn new_pair_starts_safe() {
        let lamps = LampPair::new(SimRelay::new("led0"), SimRelay::new("led2")).unwrap();
        assert_eq!(lamps.state(), IndicatorState::Safe);
        assert_eq!(lamps.levels(), (true, false));
    }

    #[test]
    fn lamps_are_mutually_exclusive() {
        let mut lamps = LampPair::new(SimRelay::new("led0"), SimRelay::new("led2")).unwrap();

        lamps.set_unsafe().unwrap();
        assert_eq!(lamps.levels(), (false, true));

        lamps.set_safe().unwrap();
        assert_eq!(lamps.levels(), (true, false));
    }

    #[test]
    fn set_unsafe_is_idempotent() {
        let mut lamps = LampPair::new(SimRelay::new("led0"), SimRelay::new("led2")).unwrap();
        lamps.set_unsafe().unwrap();
        lamps.set_unsafe().unwrap();
        assert_eq!(lamps.state(), IndicatorState::Unsafe);
        assert_eq!(lamps.levels(), (false, true));
    }

    #[test]
    fn missing_lamp_is_device_not_ready() {
        let result = LampPair::new(SimRelay::new("led0"), SimRelay::not_ready("led2"));
        match result {
            Err(InterlockError::DeviceNotReady(id)) => assert_eq!(id, "led2"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected DeviceNotReady"),
        }
    }

    #[test]
    fn faulty_lamp_surfaces_hardware_fault() {
        // A faulty lamp only fails when driven on, so bring-up succeeds.
        let mut lamps = LampPair::new(SimRelay::new("led0"), SimRelay::faulty("led2")).unwrap();
        let result = lamps.set_unsafe();
        assert!(matches!(result, Err(InterlockError::HardwareFault { .. })));
    }
}
