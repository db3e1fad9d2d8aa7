//! # Queue Container
//!
//! Builds the engine and everything around it, in dependency order:
//!
//! 1. Event bus
//! 2. Repository
//! 3. Queue service (publishing to the bus)
//! 4. Retrying API facade
//! 5. Grace-period scheduler
//!
//! Staff-facing adapters talk to [`QueueContainer::api`]; background tasks
//! only see the bus and the service.

pub mod config;

pub use config::{ConfigError, RuntimeConfig};

use queue_engine::{
    BusEventSink, GracePeriodScheduler, InMemoryQueueRepository, QueueService, RetryingQueueApi,
    SystemTimeSource,
};
use shared_bus::InMemoryEventBus;
use std::sync::Arc;
use tracing::info;

pub type EventSink = BusEventSink<InMemoryEventBus>;
pub type EngineService = QueueService<InMemoryQueueRepository, EventSink, SystemTimeSource>;
pub type EngineScheduler =
    GracePeriodScheduler<InMemoryQueueRepository, EventSink, SystemTimeSource>;
pub type EngineApi = RetryingQueueApi<Arc<EngineService>>;

pub struct QueueContainer {
    pub config: RuntimeConfig,
    pub bus: Arc<InMemoryEventBus>,
    pub repository: Arc<InMemoryQueueRepository>,
    pub service: Arc<EngineService>,
    pub api: Arc<EngineApi>,
    pub scheduler: Arc<EngineScheduler>,
}

impl QueueContainer {
    pub fn new(config: RuntimeConfig) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let repository = Arc::new(InMemoryQueueRepository::new());
        let sink = Arc::new(BusEventSink::new(Arc::clone(&bus)));
        let service = Arc::new(QueueService::new(
            Arc::clone(&repository),
            sink,
            SystemTimeSource,
            config.queue.clone(),
        ));
        let api = Arc::new(RetryingQueueApi::new(Arc::clone(&service)));
        let scheduler = Arc::new(GracePeriodScheduler::new(
            Arc::clone(&service),
            config.scheduler.clone(),
        ));

        info!(
            grace_minutes = config.queue.default_grace_period_minutes,
            reopen_window_secs = config.queue.reopen_window_secs,
            lock_timeout_ms = config.queue.lock_timeout_ms,
            "Queue container initialized"
        );

        Self {
            config,
            bus,
            repository,
            service,
            api,
            scheduler,
        }
    }

    /// Entry point for staff-facing adapters.
    pub fn api(&self) -> Arc<EngineApi> {
        Arc::clone(&self.api)
    }
}
