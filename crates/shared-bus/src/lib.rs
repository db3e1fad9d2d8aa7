//! # Shared Bus - Event Bus for Queue Events
//!
//! Every committed queue mutation is announced here. Consumers (patient
//! notifications, the grace-period scheduler, dashboards) subscribe with a
//! filter and never call back into the queue directly.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ Queue Engine │                    │ Notification │
//! │              │    publish()       │  collaborator│
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! Delivery is best-effort: a publish with no subscribers is dropped and
//! slow subscribers skip lagged events.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventMeta, EventTopic, QueueEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before backpressure.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
