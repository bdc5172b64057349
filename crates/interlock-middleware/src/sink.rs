//! [`EventSink`] – where the control loops send their records.
//!
//! Recording is fire-and-forget: `record` returns nothing, and the
//! [`Recorder`] the loops actually call through swallows sink panics so a
//! broken observer can never take a control loop down with it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use interlock_types::{Event, EventPayload, IndicatorState};
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;

/// Destination for observability records.
pub trait EventSink: Send + Sync {
    /// Accept `event`.  Must not block for long and must not fail.
    fn record(&self, event: Event);
}

impl EventSink for EventBus {
    /// Publish to the payload's topic.  Having no subscribers is normal and
    /// silently ignored.
    fn record(&self, event: Event) {
        let _ = self.publish(event);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSink
// ─────────────────────────────────────────────────────────────────────────────

/// Writes every record as a structured `tracing` event.
///
/// Levels: publish/consume at `info`, an accepted high-intensity command at
/// `warn`, violations and UNSAFE at `error`, SAFE at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        let source = event.source.as_str();
        match event.payload {
            EventPayload::CommandPublished(cmd) => info!(
                source,
                seq = cmd.sequence,
                mode = %cmd.mode,
                intensity = cmd.intensity,
                "command published"
            ),
            EventPayload::CommandConsumed(r) => info!(
                source,
                seq_before = r.seq_before,
                seq_after = r.seq_after,
                mode = %r.mode,
                intensity = r.intensity,
                "command consumed"
            ),
            EventPayload::HighIntensityAccepted(r) => warn!(
                source,
                seq = r.seq_after,
                mode = %r.mode,
                intensity = r.intensity,
                "high-intensity command accepted: read was atomic"
            ),
            EventPayload::Violation {
                kind,
                reading,
                message,
            } => error!(
                source,
                %kind,
                seq_before = reading.seq_before,
                seq_after = reading.seq_after,
                mode = %reading.mode,
                intensity = reading.intensity,
                "{message}"
            ),
            EventPayload::IndicatorChanged(IndicatorState::Unsafe) => {
                error!(source, "indicator latched UNSAFE")
            }
            EventPayload::IndicatorChanged(IndicatorState::Safe) => {
                debug!(source, "indicator SAFE")
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SinkSet
// ─────────────────────────────────────────────────────────────────────────────

/// Fans each record out to several sinks, in registration order.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use interlock_middleware::{EventBus, EventSink, SinkSet, Topic, TracingSink};
/// use interlock_types::{Command, Event, EventPayload};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe_to(Topic::Commands);
/// let sinks = SinkSet::new().with(Arc::new(TracingSink)).with(Arc::new(bus));
///
/// sinks.record(Event::new("doc", EventPayload::CommandPublished(Command::for_sequence(1))));
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct SinkSet {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `sink` to the set.
    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for SinkSet {
    fn record(&self, event: Event) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recorder
// ─────────────────────────────────────────────────────────────────────────────

/// Per-loop handle that stamps payloads with a source and records them.
#[derive(Clone)]
pub struct Recorder {
    source: &'static str,
    sink: Arc<dyn EventSink>,
}

impl Recorder {
    /// `source` names the emitting loop, e.g. `"interlock-runtime::producer"`.
    pub fn new(source: &'static str, sink: Arc<dyn EventSink>) -> Self {
        Self { source, sink }
    }

    pub fn source(&self) -> &'static str {
        self.source
    }

    /// Record `payload`.  A panicking sink is logged and otherwise ignored.
    pub fn record(&self, payload: EventPayload) {
        let event = Event::new(self.source, payload);
        if catch_unwind(AssertUnwindSafe(|| self.sink.record(event))).is_err() {
            warn!(source = self.source, "event sink panicked; record dropped");
        }
    }
}
