//! Event sink adapters.
//!
//! Forward committed queue events to the shared bus.

use crate::ports::QueueEventSink;
use async_trait::async_trait;
use shared_bus::{EventPublisher, QueueEvent};
use std::sync::Arc;
use tracing::debug;

/// Publishes to any [`EventPublisher`], typically the in-memory bus.
pub struct BusEventSink<P: EventPublisher + ?Sized> {
    bus: Arc<P>,
}

impl<P: EventPublisher + ?Sized> BusEventSink<P> {
    pub fn new(bus: Arc<P>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<P: EventPublisher + ?Sized> QueueEventSink for BusEventSink<P> {
    async fn publish_all(&self, events: Vec<QueueEvent>) -> usize {
        let mut delivered = 0;
        for event in events {
            let name = event.name();
            let receivers = self.bus.publish(event).await;
            if receivers > 0 {
                delivered += 1;
            }
            debug!(event = name, receivers, "Queue event forwarded");
        }
        delivered
    }
}

/// No-op sink for running without an event bus.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl QueueEventSink for NoOpEventSink {
    async fn publish_all(&self, _events: Vec<QueueEvent>) -> usize {
        0
    }
}
