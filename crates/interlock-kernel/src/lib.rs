//! `interlock-kernel` – Safety Primitives
//!
//! The kernel owns the shared state and the rules.  It does not schedule
//! anything; the loops in `interlock-runtime` call into it.
//!
//! # Modules
//!
//! - [`command`] – [`CommandGuard`][command::CommandGuard]: the Guard that
//!   owns the shared command record.  Every read or write of the record
//!   happens through a [`CommandSession`][command::CommandSession], so a
//!   critical section always spans every field it touches.
//! - [`latch`] – [`SafetyLatch`][latch::SafetyLatch]: the one-way trip flag
//!   that every loop polls and the consumer sets on a violation.
//! - [`shutdown`] – [`ShutdownSignal`][shutdown::ShutdownSignal]: an operator
//!   stop request that ends the loops without tripping the latch.
//! - [`verifier`] – [`ReadingVerifier`][verifier::ReadingVerifier]: a rule
//!   engine that checks every consumed
//!   [`CommandReading`][interlock_types::CommandReading] for torn reads,
//!   policy mismatches and dangerous combinations.

pub mod command;
pub mod latch;
pub mod shutdown;
pub mod verifier;

pub use command::{CommandGuard, CommandSession, SharedCommand};
pub use latch::{LatchState, SafetyLatch};
pub use shutdown::ShutdownSignal;
pub use verifier::{
    FieldConsistencyRule, HighIntensityRule, ReadingVerifier, Rule, SequenceStableRule,
};
