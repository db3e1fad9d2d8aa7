//! # Subscriptions
//!
//! A consumer's view of the bus: the grace-period scheduler waits on
//! [`Subscription::recv`] for absences to track, the notification log does
//! the same for everything patient-facing, and tests [`drain`] what was
//! published so far.
//!
//! [`drain`]: Subscription::drain

use crate::events::{EventFilter, QueueEvent};
use thiserror::Error;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// Filtered receiver of queue events. Dropping it unsubscribes.
pub struct Subscription {
    receiver: Receiver<QueueEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: Receiver<QueueEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    ///
    /// Events lost to lag are skipped with a warning; consumers that need
    /// every deadline recover them from storage.
    pub async fn recv(&mut self) -> Option<QueueEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => warn!(missed, "Subscriber fell behind"),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next matching event if one is already buffered.
    pub fn try_recv(&mut self) -> Result<Option<QueueEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => warn!(missed, "Subscriber fell behind"),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Every matching event buffered right now, oldest first.
    pub fn drain(&mut self) -> Vec<QueueEvent> {
        std::iter::from_fn(|| self.try_recv().ok().flatten()).collect()
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
