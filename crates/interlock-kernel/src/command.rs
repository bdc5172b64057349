//! [`CommandGuard`] – mutual exclusion over the shared command record.
//!
//! The record ([`SharedCommand`]) has no public setters.  The only way to
//! change it is to [`acquire`][CommandGuard::acquire] the Guard and write
//! through the returned [`CommandSession`]; the Guard is released when the
//! session is dropped (or [`released`][CommandSession::release]
//! explicitly).  A multi-field update therefore cannot be observed half-done
//! by anyone who also went through the Guard.
//!
//! # Example
//!
//! ```
//! use interlock_kernel::CommandGuard;
//! use interlock_types::Mode;
//!
//! let guard = CommandGuard::new();
//!
//! let mut session = guard.acquire();
//! session.set_sequence(1);
//! session.set_mode(Mode::Photon);
//! session.set_intensity(100);
//! session.mark_ready();
//! session.release();
//!
//! let record = guard.snapshot();
//! assert!(record.is_ready());
//! assert_eq!(record.sequence(), 1);
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};

use interlock_types::{Command, Mode};

// ────────────────────────────────────────────────────────────────────────────
// SharedCommand
// ────────────────────────────────────────────────────────────────────────────

/// The multi-field command record shared by the operator and hardware loops.
///
/// `ready` is `true` only while `sequence`, `mode` and `intensity` all belong
/// to the same published command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedCommand {
    sequence: u64,
    mode: Mode,
    intensity: u32,
    ready: bool,
}

impl SharedCommand {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn intensity(&self) -> u32 {
        self.intensity
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// The published command, or `None` while the record is not ready.
    pub fn ready_command(&self) -> Option<Command> {
        self.ready.then_some(Command {
            sequence: self.sequence,
            mode: self.mode,
            intensity: self.intensity,
        })
    }
}

impl Default for SharedCommand {
    /// The startup state: `sequence=0, mode=Electron, intensity=0,
    /// ready=false`.
    fn default() -> Self {
        Self {
            sequence: 0,
            mode: Mode::Electron,
            intensity: 0,
            ready: false,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CommandGuard
// ────────────────────────────────────────────────────────────────────────────

/// Owns the [`SharedCommand`] and hands out exclusive sessions on it.
///
/// Share it between threads with an `Arc`.
#[derive(Debug, Default)]
pub struct CommandGuard {
    record: Mutex<SharedCommand>,
}

impl CommandGuard {
    /// Create a Guard over a record in its startup state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the Guard is free and return an exclusive session.
    ///
    /// Acquisition never fails.  If a previous holder panicked, the record
    /// is handed over as it was left; the producer clears `ready` before
    /// touching any other field, so a half-written record is never ready.
    pub fn acquire(&self) -> CommandSession<'_> {
        CommandSession {
            record: self.record.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Return a session only if the Guard is free right now.
    pub fn try_acquire(&self) -> Option<CommandSession<'_>> {
        match self.record.try_lock() {
            Ok(record) => Some(CommandSession { record }),
            Err(TryLockError::Poisoned(poisoned)) => Some(CommandSession {
                record: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    /// Copy of the whole record taken inside one critical section.
    pub fn snapshot(&self) -> SharedCommand {
        self.acquire().record()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// CommandSession
// ────────────────────────────────────────────────────────────────────────────

/// Exclusive access to the [`SharedCommand`] for the lifetime of the value.
pub struct CommandSession<'a> {
    record: MutexGuard<'a, SharedCommand>,
}

impl CommandSession<'_> {
    pub fn sequence(&self) -> u64 {
        self.record.sequence
    }

    pub fn mode(&self) -> Mode {
        self.record.mode
    }

    pub fn intensity(&self) -> u32 {
        self.record.intensity
    }

    pub fn is_ready(&self) -> bool {
        self.record.ready
    }

    /// Copy of the record as it stands inside this session.
    pub fn record(&self) -> SharedCommand {
        *self.record
    }

    pub fn set_sequence(&mut self, sequence: u64) {
        self.record.sequence = sequence;
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.record.mode = mode;
    }

    pub fn set_intensity(&mut self, intensity: u32) {
        self.record.intensity = intensity;
    }

    /// Declare every field written for the current sequence.
    pub fn mark_ready(&mut self) {
        self.record.ready = true;
    }

    /// Withdraw the ready flag, either because the command was consumed or
    /// because a new one is about to be written.
    pub fn clear_ready(&mut self) {
        self.record.ready = false;
    }

    /// Release the Guard.  Equivalent to dropping the session.
    pub fn release(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn publish(guard: &CommandGuard, sequence: u64) {
        let mode = Mode::for_sequence(sequence);
        let mut session = guard.acquire();
        session.clear_ready();
        session.set_sequence(sequence);
        session.set_mode(mode);
        thread::yield_now();
        session.set_intensity(mode.intensity());
        session.mark_ready();
    }

    #[test]
    fn starts_in_startup_state() {
        let record = CommandGuard::new().snapshot();
        assert_eq!(record.sequence(), 0);
        assert_eq!(record.mode(), Mode::Electron);
        assert_eq!(record.intensity(), 0);
        assert!(!record.is_ready());
        assert_eq!(record.ready_command(), None);
    }

    #[test]
    fn writes_are_visible_after_release() {
        let guard = CommandGuard::new();
        publish(&guard, 3);

        let command = guard.snapshot().ready_command().expect("must be ready");
        assert_eq!(command, Command::for_sequence(3));
    }

    #[test]
    fn clear_ready_withdraws_command() {
        let guard = CommandGuard::new();
        publish(&guard, 1);
        guard.acquire().clear_ready();

        let record = guard.snapshot();
        assert!(!record.is_ready());
        // The fields themselves are left in place.
        assert_eq!(record.sequence(), 1);
    }

    #[test]
    fn held_guard_excludes_other_sessions() {
        let guard = CommandGuard::new();
        let session = guard.acquire();
        assert!(guard.try_acquire().is_none());
        session.release();
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn poisoned_guard_is_recovered() {
        let guard = Arc::new(CommandGuard::new());
        let g = Arc::clone(&guard);
        let result = thread::spawn(move || {
            let mut session = g.acquire();
            session.clear_ready();
            session.set_sequence(9);
            panic!("writer died mid-update");
        })
        .join();
        assert!(result.is_err());

        let record = guard.snapshot();
        assert_eq!(record.sequence(), 9);
        assert!(!record.is_ready(), "a half-written record must not be ready");
    }

    #[test]
    fn concurrent_publishers_never_expose_mixed_fields() {
        let guard = Arc::new(CommandGuard::new());
        let writers: Vec<_> = (0..2u64)
            .map(|offset| {
                let g = Arc::clone(&guard);
                thread::spawn(move || {
                    for i in 0..2_000u64 {
                        publish(&g, i * 2 + offset);
                    }
                })
            })
            .collect();

        for _ in 0..2_000 {
            let record = guard.snapshot();
            if let Some(command) = record.ready_command() {
                assert_eq!(command.mode, Mode::for_sequence(command.sequence));
                assert_eq!(command.intensity, command.mode.intensity());
            }
        }

        for w in writers {
            w.join().unwrap();
        }
    }
}
