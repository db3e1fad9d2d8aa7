//! # Event Publisher
//!
//! The queue engine hands committed events to an [`EventPublisher`]. The
//! in-process implementation fans each event out over a tokio broadcast
//! channel; consumers pick their share through a [`Subscription`] filter.

use crate::events::{EventFilter, QueueEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Sink for committed queue events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Announce one event. Returns how many subscriptions it reached,
    /// before their filters are applied.
    async fn publish(&self, event: QueueEvent) -> usize;
}

/// Broadcast bus shared by every consumer in the process.
///
/// Each subscription owns a bounded buffer of `capacity` events. A
/// consumer that falls further behind loses the oldest ones.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<QueueEvent>,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Start receiving events published from now on.
    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, clinics = ?filter.clinics, "Subscribed to queue events");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: QueueEvent) -> usize {
        let name = event.name();
        let clinic_id = event.meta().clinic_id.clone();
        // A send error only means nobody is listening yet.
        let reached = self.sender.send(event).unwrap_or(0);
        trace!(event = name, clinic_id = %clinic_id, reached, "Queue event published");
        reached
    }
}
