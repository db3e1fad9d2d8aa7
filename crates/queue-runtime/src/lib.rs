//! # Clinic Queue Runtime
//!
//! Hosts the queue engine as a long-running process.
//!
//! ## Modular Structure
//!
//! - `container/` - configuration and dependency wiring
//! - `handlers/` - event bus consumers
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults, then `CQ_*` environment variables)
//! 2. Validate it
//! 3. Build the container (bus, repository, service, scheduler)
//! 4. Spawn the grace-period scheduler and the notification log handler
//! 5. Wait for Ctrl+C, then signal shutdown and join the tasks
//!
//! ```text
//!  staff adapters ──→ RetryingQueueApi ──→ QueueService ──commit──→ Repository
//!                                              │
//!                                              └──publish──→ Event Bus ──→ NotificationLogHandler
//!                                                               │
//!                       GracePeriodScheduler ←──PatientMarkedAbsent
//!                               │
//!                               └──expire_absence──→ QueueService
//! ```

pub mod container;
pub mod handlers;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventTopic};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::container::{QueueContainer, RuntimeConfig};
use crate::handlers::NotificationLogHandler;

/// The queue process: container plus background tasks.
pub struct QueueRuntime {
    container: Arc<QueueContainer>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl QueueRuntime {
    /// Validate `config` and build the container.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        config.validate().context("invalid runtime configuration")?;
        let container = Arc::new(QueueContainer::new(config));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            container,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the background tasks.
    pub async fn start(&self) -> Result<()> {
        info!("===========================================");
        info!("  Clinic Queue Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        // Recover deadlines of absences recorded before startup.
        let recovered = self
            .container
            .scheduler
            .sweep()
            .await
            .context("initial open-absence sweep failed")?;
        info!(recovered, "Grace-period deadlines loaded");

        let scheduler_events = self
            .container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Attendance]));
        let scheduler = Arc::clone(&self.container.scheduler);
        let shutdown = self.shutdown_rx.clone();
        self.tasks.lock().push(tokio::spawn(async move {
            scheduler.run(scheduler_events, shutdown).await;
        }));

        let notifications =
            NotificationLogHandler::new(self.container.bus.subscribe(EventFilter::all()));
        let shutdown = self.shutdown_rx.clone();
        self.tasks.lock().push(tokio::spawn(async move {
            notifications.run(shutdown).await;
        }));

        info!("Background tasks started");
        Ok(())
    }

    /// Signal shutdown and wait for the background tasks.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Background task ended abnormally");
            }
        }
        info!("Shutdown complete");
    }

    pub fn container(&self) -> Arc<QueueContainer> {
        Arc::clone(&self.container)
    }
}
