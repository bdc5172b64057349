//! `interlock-hal` – Hardware Abstraction Layer
//!
//! The only hardware the interlock touches is its external safety indicator:
//! two discrete outputs, one lit while the system is safe and one lit once
//! the safety latch has tripped.
//!
//! # Modules
//!
//! - [`relay`] – [`Relay`][relay::Relay]: a discrete on/off output (GPIO
//!   pin, lamp, solenoid).
//! - [`indicator`] – [`Indicator`][indicator::Indicator]: the SAFE/UNSAFE
//!   signal driven by the monitor loop, and [`LampPair`][indicator::LampPair],
//!   which drives two relays as mutually exclusive lamps.
//! - [`sim`] – simulated relays and a recording indicator for headless runs
//!   and tests.

pub mod indicator;
pub mod relay;
pub mod sim;

pub use indicator::{Indicator, LampPair};
pub use relay::Relay;
pub use sim::{IndicatorProbe, SimIndicator, SimRelay};
