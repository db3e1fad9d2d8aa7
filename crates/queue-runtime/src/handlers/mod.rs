//! # Event Handlers
//!
//! Bus consumers spawned by the runtime.

pub mod notifications;

pub use notifications::NotificationLogHandler;
