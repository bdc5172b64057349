//! [`ReadingVerifier`] – consistency and safety checks on consumed commands.
//!
//! After the hardware loop has read a command, pass the
//! [`CommandReading`] through [`ReadingVerifier::verify`].  Every registered
//! [`Rule`] is evaluated in order; the first violation is returned.
//!
//! Three built-in rules are provided, registered in this order by
//! [`ReadingVerifier::standard`]:
//! - [`SequenceStableRule`] – the sequence number must be identical before
//!   and after the read ([`InterlockError::TornRead`]).
//! - [`FieldConsistencyRule`] – intensity must match the operator policy for
//!   the mode ([`InterlockError::FieldMismatch`]).
//! - [`HighIntensityRule`] – photon mode at or above a threshold is flagged
//!   ([`InterlockError::UnsafeCombination`]).  Whether that flag trips the
//!   latch is the consumer's policy, not the verifier's.

use interlock_types::{CommandReading, HIGH_INTENSITY_THRESHOLD, InterlockError};

// ────────────────────────────────────────────────────────────────────────────
// Rule trait
// ────────────────────────────────────────────────────────────────────────────

/// A single invariant that a consumed command must satisfy.
pub trait Rule: Send + Sync {
    /// Human-readable name used in diagnostics.
    fn name(&self) -> &str;

    /// Return `Ok(())` when the reading satisfies the invariant.
    fn check(&self, reading: &CommandReading) -> Result<(), InterlockError>;
}

// ────────────────────────────────────────────────────────────────────────────
// ReadingVerifier
// ────────────────────────────────────────────────────────────────────────────

/// Rule engine that validates a [`CommandReading`] against all registered
/// [`Rule`]s.
///
/// # Example
///
/// ```
/// use interlock_kernel::ReadingVerifier;
/// use interlock_types::{CommandReading, InterlockError, Mode};
///
/// let verifier = ReadingVerifier::standard();
///
/// let clean = CommandReading { seq_before: 2, seq_after: 2, mode: Mode::Electron, intensity: 10 };
/// assert!(verifier.verify(&clean).is_ok());
///
/// let torn = CommandReading { seq_before: 2, seq_after: 3, mode: Mode::Electron, intensity: 10 };
/// assert!(matches!(verifier.verify(&torn), Err(InterlockError::TornRead { .. })));
/// ```
#[derive(Default)]
pub struct ReadingVerifier {
    rules: Vec<Box<dyn Rule>>,
}

impl ReadingVerifier {
    /// Create an empty verifier with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// The verifier used by the hardware loop: torn read, field consistency,
    /// then high intensity at [`HIGH_INTENSITY_THRESHOLD`].
    pub fn standard() -> Self {
        let mut verifier = Self::new();
        verifier.add_rule(Box::new(SequenceStableRule));
        verifier.add_rule(Box::new(FieldConsistencyRule));
        verifier.add_rule(Box::new(HighIntensityRule {
            threshold: HIGH_INTENSITY_THRESHOLD,
        }));
        verifier
    }

    /// Register a new [`Rule`].  Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Names of the registered rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Validate `reading` against every registered rule.
    pub fn verify(&self, reading: &CommandReading) -> Result<(), InterlockError> {
        for rule in &self.rules {
            rule.check(reading)?;
        }
        Ok(())
    }

    /// Every violation `reading` raises, in rule order.  Empty when the
    /// reading passes.
    pub fn violations(&self, reading: &CommandReading) -> Vec<InterlockError> {
        self.rules
            .iter()
            .filter_map(|rule| rule.check(reading).err())
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Built-in rules
// ────────────────────────────────────────────────────────────────────────────

/// Rejects readings whose sequence number changed mid-read.
pub struct SequenceStableRule;

impl Rule for SequenceStableRule {
    fn name(&self) -> &str {
        "sequence_stable"
    }

    fn check(&self, reading: &CommandReading) -> Result<(), InterlockError> {
        if reading.is_torn() {
            return Err(InterlockError::TornRead {
                before: reading.seq_before,
                after: reading.seq_after,
            });
        }
        Ok(())
    }
}

/// Rejects readings whose intensity does not match the policy for the mode.
pub struct FieldConsistencyRule;

impl Rule for FieldConsistencyRule {
    fn name(&self) -> &str {
        "field_consistency"
    }

    fn check(&self, reading: &CommandReading) -> Result<(), InterlockError> {
        if !reading.is_consistent() {
            return Err(InterlockError::FieldMismatch {
                sequence: reading.seq_after,
                mode: reading.mode,
                intensity: reading.intensity,
            });
        }
        Ok(())
    }
}

/// Flags photon commands whose intensity reaches `threshold`.
pub struct HighIntensityRule {
    /// Minimum intensity (inclusive) considered dangerous in photon mode.
    pub threshold: u32,
}

impl Rule for HighIntensityRule {
    fn name(&self) -> &str {
        "high_intensity"
    }

    fn check(&self, reading: &CommandReading) -> Result<(), InterlockError> {
        if reading.is_high_intensity(self.threshold) {
            return Err(InterlockError::UnsafeCombination {
                sequence: reading.seq_after,
                mode: reading.mode,
                intensity: reading.intensity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interlock_types::Mode;

    fn reading(seq_before: u64, seq_after: u64, mode: Mode, intensity: u32) -> CommandReading {
        CommandReading {
            seq_before,
            seq_after,
            mode,
            intensity,
        }
    }

    #[test]
    fn standard_rule_order() {
        let v = ReadingVerifier::standard();
        assert_eq!(
            v.rule_names(),
            vec!["sequence_stable", "field_consistency", "high_intensity"]
        );
    }

    #[test]
    fn electron_command_passes() {
        let v = ReadingVerifier::standard();
        assert!(v.verify(&reading(4, 4, Mode::Electron, 10)).is_ok());
    }

    #[test]
    fn photon_command_is_flagged_unsafe() {
        let v = ReadingVerifier::standard();
        assert!(matches!(
            v.verify(&reading(5, 5, Mode::Photon, 100)),
            Err(InterlockError::UnsafeCombination { sequence: 5, .. })
        ));
    }

    #[test]
    fn torn_read_wins_over_other_violations() {
        let v = ReadingVerifier::standard();
        // Torn, mismatched and high intensity at once: the torn read fires first.
        let result = v.verify(&reading(5, 6, Mode::Photon, 100));
        assert!(matches!(
            result,
            Err(InterlockError::TornRead { before: 5, after: 6 })
        ));
    }

    #[test]
    fn mismatch_detected_without_sequence_change() {
        let v = ReadingVerifier::standard();
        assert!(matches!(
            v.verify(&reading(6, 6, Mode::Photon, 10)),
            Err(InterlockError::FieldMismatch { .. })
        ));
        assert!(matches!(
            v.verify(&reading(6, 6, Mode::Electron, 100)),
            Err(InterlockError::FieldMismatch { .. })
        ));
    }

    #[test]
    fn high_intensity_boundary() {
        let rule = HighIntensityRule { threshold: 90 };
        assert!(rule.check(&reading(1, 1, Mode::Photon, 89)).is_ok());
        assert!(rule.check(&reading(1, 1, Mode::Photon, 90)).is_err());
    }

    #[test]
    fn violations_lists_every_failing_rule_in_order() {
        let v = ReadingVerifier::standard();
        assert!(v.violations(&reading(4, 4, Mode::Electron, 10)).is_empty());

        let all = v.violations(&reading(5, 6, Mode::Photon, 100));
        assert_eq!(all.len(), 2);
        assert!(matches!(all[0], InterlockError::TornRead { .. }));
        assert!(matches!(all[1], InterlockError::UnsafeCombination { .. }));
    }

    #[test]
    fn empty_verifier_always_passes() {
        let v = ReadingVerifier::new();
        assert!(v.verify(&reading(1, 9, Mode::Photon, 100)).is_ok());
    }
}
