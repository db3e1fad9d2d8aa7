//! # Clinic Queue Runtime
//!
//! Entry point: logging, configuration, start, Ctrl+C, shutdown.

use anyhow::Result;
use queue_runtime::container::RuntimeConfig;
use queue_runtime::QueueRuntime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = RuntimeConfig::from_env();

    // Initialize logging
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let runtime = QueueRuntime::new(config)?;
    runtime.start().await?;

    info!("Clinic queue is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;

    Ok(())
}
