use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Intensity the operator policy assigns to [`Mode::Photon`].
pub const PHOTON_INTENSITY: u32 = 100;

/// Intensity the operator policy assigns to [`Mode::Electron`].
pub const ELECTRON_INTENSITY: u32 = 10;

/// Photon commands at or above this intensity are flagged as dangerous.
pub const HIGH_INTENSITY_THRESHOLD: u32 = 90;

/// Treatment mode carried by a command.
///
/// The operator loop alternates between the two variants on every sequence
/// number so that a torn read produces the widest possible divergence
/// between mode and intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Low-intensity mode (`MODE_A`).
    #[default]
    Electron,
    /// High-intensity mode (`MODE_B`).
    Photon,
}

impl Mode {
    /// Mode chosen for `sequence`: odd sequences are [`Mode::Photon`], even
    /// ones [`Mode::Electron`].
    pub fn for_sequence(sequence: u64) -> Self {
        if sequence & 1 == 1 {
            Mode::Photon
        } else {
            Mode::Electron
        }
    }

    /// The intensity the operator policy pairs with this mode.
    pub fn intensity(self) -> u32 {
        match self {
            Mode::Photon => PHOTON_INTENSITY,
            Mode::Electron => ELECTRON_INTENSITY,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Electron => write!(f, "ELECTRON"),
            Mode::Photon => write!(f, "PHOTON"),
        }
    }
}

/// A fully built command as published by the operator loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub sequence: u64,
    pub mode: Mode,
    pub intensity: u32,
}

impl Command {
    /// Build the command for `sequence` under the fixed mode/intensity policy.
    pub fn for_sequence(sequence: u64) -> Self {
        let mode = Mode::for_sequence(sequence);
        Self {
            sequence,
            mode,
            intensity: mode.intensity(),
        }
    }
}

/// What the hardware loop actually observed while consuming one command.
///
/// `seq_before` and `seq_after` bracket the reads of `mode` and `intensity`;
/// they differ only if the record was rewritten in the middle of the read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReading {
    pub seq_before: u64,
    pub seq_after: u64,
    pub mode: Mode,
    pub intensity: u32,
}

impl CommandReading {
    /// `true` when the sequence number changed during the read.
    pub fn is_torn(&self) -> bool {
        self.seq_before != self.seq_after
    }

    /// `true` when `intensity` matches the policy for `mode`.
    pub fn is_consistent(&self) -> bool {
        self.intensity == self.mode.intensity()
    }

    /// `true` for a photon command at or above `threshold`.
    pub fn is_high_intensity(&self, threshold: u32) -> bool {
        self.mode == Mode::Photon && self.intensity >= threshold
    }
}

/// Classification of a consumer-side safety violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The command changed while it was being read.
    TornRead,
    /// Mode and intensity disagree with the operator policy.
    FieldMismatch,
    /// Photon mode at a dangerous intensity.
    UnsafeCombination,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::TornRead => write!(f, "torn_read"),
            ViolationKind::FieldMismatch => write!(f, "field_mismatch"),
            ViolationKind::UnsafeCombination => write!(f, "unsafe_combination"),
        }
    }
}

/// The two mutually exclusive signals of the external safety indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorState {
    Safe,
    Unsafe,
}

/// Observability record emitted by the control loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "interlock-runtime::consumer"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp `payload` with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data recorded by the control loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    /// The operator loop released the Guard on a ready command.
    CommandPublished(Command),
    /// The hardware loop consumed a ready command.
    CommandConsumed(CommandReading),
    /// A dangerous combination was accepted because the read was atomic.
    HighIntensityAccepted(CommandReading),
    /// A violation tripped the safety latch.
    Violation {
        kind: ViolationKind,
        reading: CommandReading,
        message: String,
    },
    /// The monitor drove the indicator.
    IndicatorChanged(IndicatorState),
}

/// Error type spanning consumer-side violations, device bring-up and thread
/// plumbing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterlockError {
    #[error("Torn Read: sequence changed from {before} to {after} during read")]
    TornRead { before: u64, after: u64 },

    #[error("Field Mismatch on sequence {sequence}: {mode} with intensity {intensity}")]
    FieldMismatch {
        sequence: u64,
        mode: Mode,
        intensity: u32,
    },

    #[error("Unsafe Combination on sequence {sequence}: {mode} at intensity {intensity}")]
    UnsafeCombination {
        sequence: u64,
        mode: Mode,
        intensity: u32,
    },

    #[error("Device Not Ready: {0}")]
    DeviceNotReady(String),

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Channel Error: {0}")]
    Channel(String),

    #[error("Thread Error: {0}")]
    Thread(String),
}

impl InterlockError {
    /// The violation class of a consumer-side error, `None` for plumbing
    /// errors.
    pub fn violation_kind(&self) -> Option<ViolationKind> {
        match self {
            InterlockError::TornRead { .. } => Some(ViolationKind::TornRead),
            InterlockError::FieldMismatch { .. } => Some(ViolationKind::FieldMismatch),
            InterlockError::UnsafeCombination { .. } => Some(ViolationKind::UnsafeCombination),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(seq_before: u64, seq_after: u64, mode: Mode, intensity: u32) -> CommandReading {
        CommandReading {
            seq_before,
            seq_after,
            mode,
            intensity,
        }
    }

    #[test]
    fn mode_alternates_with_sequence_parity() {
        assert_eq!(Mode::for_sequence(0), Mode::Electron);
        assert_eq!(Mode::for_sequence(1), Mode::Photon);
        assert_eq!(Mode::for_sequence(2), Mode::Electron);
        assert_eq!(Mode::for_sequence(7), Mode::Photon);
    }

    #[test]
    fn intensity_policy() {
        assert_eq!(Mode::Photon.intensity(), 100);
        assert_eq!(Mode::Electron.intensity(), 10);

        let cmd = Command::for_sequence(3);
        assert_eq!(cmd.mode, Mode::Photon);
        assert_eq!(cmd.intensity, PHOTON_INTENSITY);
    }

    #[test]
    fn reading_predicates() {
        let clean = reading(4, 4, Mode::Electron, 10);
        assert!(!clean.is_torn());
        assert!(clean.is_consistent());
        assert!(!clean.is_high_intensity(HIGH_INTENSITY_THRESHOLD));

        let torn = reading(4, 5, Mode::Photon, 10);
        assert!(torn.is_torn());
        assert!(!torn.is_consistent());

        let hot = reading(5, 5, Mode::Photon, 100);
        assert!(hot.is_high_intensity(HIGH_INTENSITY_THRESHOLD));
        assert!(hot.is_high_intensity(100));
        assert!(!hot.is_high_intensity(101));
    }

    #[test]
    fn electron_is_never_high_intensity() {
        let odd = reading(2, 2, Mode::Electron, 100);
        assert!(!odd.is_high_intensity(HIGH_INTENSITY_THRESHOLD));
    }

    #[test]
    fn violation_payload_serializes_with_tag() {
        let event = Event::new(
            "interlock-runtime::consumer",
            EventPayload::Violation {
                kind: ViolationKind::TornRead,
                reading: reading(8, 9, Mode::Photon, 10),
                message: "sequence changed".to_string(),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"violation\""));
        assert!(json.contains("\"torn_read\""));

        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        match back.payload {
            EventPayload::Violation { kind, reading, .. } => {
                assert_eq!(kind, ViolationKind::TornRead);
                assert!(reading.is_torn());
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn interlock_error_display() {
        let err = InterlockError::TornRead {
            before: 41,
            after: 42,
        };
        assert!(err.to_string().contains("Torn Read"));
        assert!(err.to_string().contains("41"));

        let err2 = InterlockError::UnsafeCombination {
            sequence: 7,
            mode: Mode::Photon,
            intensity: 100,
        };
        assert!(err2.to_string().contains("PHOTON"));

        let err3 = InterlockError::DeviceNotReady("led2".to_string());
        assert!(err3.to_string().contains("led2"));
    }

    #[test]
    fn violation_kind_mapping() {
        let torn = InterlockError::TornRead { before: 1, after: 2 };
        assert_eq!(torn.violation_kind(), Some(ViolationKind::TornRead));

        let mismatch = InterlockError::FieldMismatch {
            sequence: 1,
            mode: Mode::Photon,
            intensity: 10,
        };
        assert_eq!(mismatch.violation_kind(), Some(ViolationKind::FieldMismatch));

        let plumbing = InterlockError::Channel("closed".to_string());
        assert_eq!(plumbing.violation_kind(), None);
    }
}
