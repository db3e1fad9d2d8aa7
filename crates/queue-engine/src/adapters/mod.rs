//! Adapters layer: concrete implementations of the outbound ports plus
//! decorators over the inbound API.

pub mod memory_store;
pub mod publisher;
pub mod retry;

pub use memory_store::InMemoryQueueRepository;
pub use publisher::{BusEventSink, NoOpEventSink};
pub use retry::RetryingQueueApi;
