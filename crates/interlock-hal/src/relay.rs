//! Generic `Relay` trait for discrete on/off outputs (GPIO pins, lamps,
//! solenoids, …).

use interlock_types::InterlockError;

/// A discrete on/off hardware output.
///
/// Drivers implement this trait and are composed into an
/// [`Indicator`][crate::indicator::Indicator] such as
/// [`LampPair`][crate::indicator::LampPair].
pub trait Relay: Send + Sync {
    /// Stable identifier for this relay, e.g. `"led0"`.
    fn id(&self) -> &str;

    /// Whether the underlying device was found and configured.
    ///
    /// Checked once at bring-up; a relay that is not ready prevents the
    /// control loops from starting.
    fn is_ready(&self) -> bool {
        true
    }

    /// Drive the relay to `active` (`true` = energised / on,
    /// `false` = de-energised / off).
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::HardwareFault`] if the command cannot be
    /// applied.
    fn set_state(&mut self, active: bool) -> Result<(), InterlockError>;

    /// Return the relay's current state (`true` = energised).
    fn state(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockRelay {
        id: String,
        state: bool,
    }

    impl MockRelay {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_string(),
                state: false,
            }
        }
    }

    impl Relay for MockRelay {
        fn id(&self) -> &str {
            &self.id
        }

        fn set_state(&mut self, active: bool) -> Result<(), InterlockError> {
            self.state = active;
            Ok(())
        }

        fn state(&self) -> bool {
            self.state
        }
    }

    #[test]
    fn mock_relay_toggle() {
        let mut relay = MockRelay::new("led0");
        assert_eq!(relay.id(), "led0");
        assert!(relay.is_ready());
        assert!(!relay.state());

        relay.set_state(true).unwrap();
        assert!(relay.state());

        relay.set_state(false).unwrap();
        assert!(!relay.state());
    }
}
