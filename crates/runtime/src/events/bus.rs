//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::{EquipmentChanged, ItemsChanged, ReplicationEvent};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Container and item changes
    Items,
    /// Equipment grants and removals
    Equipment,
    /// Replica connections and outgoing updates
    Replication,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Items, Topic::Equipment, Topic::Replication];
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Items(ItemsChanged),
    Equipment(EquipmentChanged),
    Replication(ReplicationEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Items(_) => Topic::Items,
            Event::Equipment(_) => Topic::Equipment,
            Event::Replication(_) => Topic::Replication,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Topics are fixed at construction, so the channel
/// map is shared without a lock.
pub struct EventBus {
    channels: Arc<HashMap<Topic, broadcast::Sender<Event>>>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let channels = Topic::ALL
            .into_iter()
            .map(|topic| (topic, broadcast::channel(capacity).0))
            .collect();

        Self {
            channels: Arc::new(channels),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if let Some(tx) = self.channels.get(&topic)
            && tx.send(event).is_err()
        {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        match self.channels.get(&topic) {
            Some(tx) => tx.subscribe(),
            // Unreachable for buses built by `with_capacity`.
            None => broadcast::channel(1).1,
        }
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            channels: Arc::clone(&self.channels),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::new();
        let mut items = bus.subscribe(Topic::Items);
        let mut replication = bus.subscribe(Topic::Replication);

        bus.publish(Event::Replication(ReplicationEvent::Connected {
            replica: crate::api::ReplicaId(1),
        }));

        assert!(matches!(
            replication.recv().await.unwrap(),
            Event::Replication(ReplicationEvent::Connected { .. })
        ));
        assert!(items.try_recv().is_err());
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let bus = EventBus::with_capacity(4);
        bus.publish(Event::Items(ItemsChanged {
            owner: "hero".into(),
            events: Vec::new(),
        }));
    }
}
