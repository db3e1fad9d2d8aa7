//! Ports layer for the clinic queue.
//!
//! Defines the hexagonal architecture port traits:
//! - Inbound (Driving) ports: API exposed to staff-facing adapters
//! - Outbound (Driven) ports: storage, event sink and clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
