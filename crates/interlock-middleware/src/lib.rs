//! `interlock-middleware` – Observability Plumbing
//!
//! Carries the records emitted by the control loops to whoever wants them,
//! without ever blocking or failing the loops.
//!
//! # Modules
//!
//! - [`sink`] – [`EventSink`]: the fire-and-forget `record` interface the
//!   loops write to, plus [`TracingSink`] (structured logs) and [`SinkSet`]
//!   (fan-out), and [`Recorder`], the per-loop handle that stamps and
//!   forwards records.
//! - [`bus`] – [`EventBus`]: topic-routed broadcast channels so other
//!   threads (the CLI, tests) can subscribe to commands, safety events and
//!   indicator changes.

pub mod bus;
pub mod sink;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use sink::{EventSink, Recorder, SinkSet, TracingSink};
