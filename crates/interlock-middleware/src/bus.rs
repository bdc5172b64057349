//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others, and so that publishing from a plain OS thread never waits.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Commands`] | Every published and consumed command |
//! | [`Topic::Safety`] | Violations and accepted high-intensity commands |
//! | [`Topic::Indicator`] | SAFE/UNSAFE transitions driven by the monitor |

use interlock_types::{Event, EventPayload, InterlockError};
use tokio::sync::broadcast;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Published and consumed commands.
    Commands,
    /// Violations and high-intensity warnings.
    Safety,
    /// Indicator transitions.
    Indicator,
}

impl Topic {
    /// The lane an event payload is routed to.
    pub fn of(payload: &EventPayload) -> Self {
        match payload {
            EventPayload::CommandPublished(_) | EventPayload::CommandConsumed(_) => {
                Topic::Commands
            }
            EventPayload::HighIntensityAccepted(_) | EventPayload::Violation { .. } => {
                Topic::Safety
            }
            EventPayload::IndicatorChanged(_) => Topic::Indicator,
        }
    }
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    commands: broadcast::Sender<Event>,
    safety: broadcast::Sender<Event>,
    indicator: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every topic channel independently.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (commands, _) = broadcast::channel(capacity);
        let (safety, _) = broadcast::channel(capacity);
        let (indicator, _) = broadcast::channel(capacity);
        Self {
            commands,
            safety,
            indicator,
        }
    }

    /// Publish `event` to the given [`Topic`] channel.
    ///
    /// Returns the number of active receivers that were handed the event, or
    /// [`InterlockError::Channel`] when nobody is subscribed to the topic.
    pub fn publish_to(&self, topic: Topic, event: Event) -> Result<usize, InterlockError> {
        self.topic_sender(topic)
            .send(event)
            .map_err(|_| InterlockError::Channel(format!("No subscribers for topic {topic:?}")))
    }

    /// Publish `event` to the topic its payload belongs to.
    pub fn publish(&self, event: Event) -> Result<usize, InterlockError> {
        let topic = Topic::of(&event.payload);
        self.publish_to(topic, event)
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Commands => &self.commands,
            Topic::Safety => &self.safety,
            Topic::Indicator => &self.indicator,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Topic-based receiver
// ---------------------------------------------------------------------------

/// A receiver bound to a single [`Topic`] channel.
///
/// Obtained via [`EventBus::subscribe_to`].  Use [`recv`][Self::recv] from
/// async code and [`try_recv`][Self::try_recv] from plain threads.
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.
    /// * `Err(broadcast::error::RecvError::Closed)` – every sender is gone.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Take the next buffered event without waiting.
    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Take every event currently buffered, skipping over any lag gap.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return events,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to.
    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interlock_types::{Command, IndicatorState};

    fn published(sequence: u64) -> Event {
        Event::new(
            "interlock-runtime::producer",
            EventPayload::CommandPublished(Command::for_sequence(sequence)),
        )
    }

    #[test]
    fn payloads_route_to_expected_topics() {
        assert_eq!(Topic::of(&published(1).payload), Topic::Commands);
        assert_eq!(
            Topic::of(&EventPayload::IndicatorChanged(IndicatorState::Unsafe)),
            Topic::Indicator
        );
    }

    #[test]
    fn publish_no_subscribers_returns_error() {
        let bus = EventBus::default();
        let result = bus.publish(published(1));
        assert!(matches!(result, Err(InterlockError::Channel(_))));
    }

    #[tokio::test]
    async fn publish_and_receive() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Commands);

        let event = published(7);
        bus.publish(event.clone())?;

        let received = rx.recv().await?;
        assert_eq!(received.id, event.id);
        assert_eq!(received.source, event.source);
        Ok(())
    }

    /// Two independent subscribers on the same topic both receive the event.
    #[tokio::test]
    async fn topic_multiple_subscribers_receive_same_event() -> Result<(), Box<dyn std::error::Error>>
    {
        let bus = EventBus::default();
        let mut subscriber1 = bus.subscribe_to(Topic::Commands);
        let mut subscriber2 = bus.subscribe_to(Topic::Commands);
        assert_eq!(bus.subscriber_count(Topic::Commands), 2);

        let event = published(2);
        bus.publish_to(Topic::Commands, event.clone())?;

        assert_eq!(subscriber1.recv().await?.id, event.id);
        assert_eq!(subscriber2.recv().await?.id, event.id);
        Ok(())
    }

    /// A subscriber on `Safety` must not receive events published to
    /// `Commands` because they are routed through separate channels.
    #[tokio::test]
    async fn topic_subscriber_does_not_receive_other_topic_events()
    -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut safety_sub = bus.subscribe_to(Topic::Safety);
        let _commands_sub = bus.subscribe_to(Topic::Commands);

        bus.publish(published(3))?;

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), safety_sub.recv()).await;
        assert!(
            result.is_err(),
            "Safety subscriber must not receive a Commands event"
        );
        Ok(())
    }

    #[test]
    fn try_recv_from_plain_thread() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Commands);

        let publisher = {
            let bus = bus.clone();
            std::thread::spawn(move || {
                for seq in 1..=3 {
                    bus.publish(published(seq)).unwrap();
                }
            })
        };
        publisher.join().unwrap();

        let sequences: Vec<u64> = rx
            .drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::CommandPublished(cmd) => Some(cmd.sequence),
                _ => None,
            })
            .collect();
        assert_eq!(sequences, vec![1, 2, 3]);
        assert!(rx.try_recv().is_err());
    }

    /// Flooding a low-capacity channel while a subscriber sleeps must produce
    /// a `Lagged` error rather than blocking the publisher.
    #[tokio::test]
    async fn topic_channel_lag_on_slow_subscriber() {
        const CAPACITY: usize = 64;
        let bus = EventBus::new(CAPACITY);
        let mut slow_sub = bus.subscribe_to(Topic::Commands);

        for seq in 0..10_000 {
            let _ = bus.publish(published(seq));
        }

        let result = slow_sub.recv().await;
        assert!(
            matches!(result, Err(broadcast::error::RecvError::Lagged(_))),
            "expected Lagged error, got: {result:?}"
        );
    }
}
