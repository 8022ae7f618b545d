//! Bootstrap binary: load configuration, initialize logging, register the
//! demo task kind, start the dispatcher, and run until Ctrl-C.
//!
//! Everything here — config loading, the notification transport, the CLI
//! surface — is explicitly outside the task execution core; this binary
//! exists only to wire the core together into something runnable.

#[path = "../demos/console_notifier.rs"]
mod console_notifier;
#[path = "../demos/heartbeat_task.rs"]
mod heartbeat_task;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;

use console_notifier::ConsoleNotifier;
use heartbeat_task::HeartbeatTask;
use taskwarden::{
    CommandConfig, CommandId, ConfigLoader, Dispatcher, FileSnapshotStore, IdGenerator, LoggerImpl,
    Registry, TaskHandler, TaskId, TaskKindConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::load().context("failed to load configuration")?;
    let _logger = LoggerImpl::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(app_name = %config.app_name, "starting taskwarden");

    let store = Arc::new(
        FileSnapshotStore::new(&config.snapshot.base_dir, &config.app_name)
            .await
            .context("failed to initialize snapshot store")?,
    );

    let registry = Arc::new(Registry::new());
    let counter = Arc::new(AtomicU64::new(0));
    registry.register(
        TaskId::new("HEARTBEAT").expect("static task id"),
        TaskKindConfig::new(
            vec![CommandConfig::new(
                CommandId::new("tick").expect("static command id"),
                false,
                Arc::new(|| serde_json::json!({"tick": 0, "last_seen_at": null})),
            )],
            Arc::new(move |_instance_id, _req, _config, _is_cancelled| -> Arc<dyn TaskHandler> {
                Arc::new(HeartbeatTask::new(counter.clone()))
            }),
        ),
    );

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        store,
        Arc::new(IdGenerator::new()),
        config.clone(),
    ));
    dispatcher.set_notification_sender(Arc::new(ConsoleNotifier));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = dispatcher.start(shutdown_rx).context("failed to start dispatcher")?;

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("shutdown signal received, draining active instances");
    let _ = shutdown_tx.send(true);
    worker_handle.await.context("dispatcher task panicked")?;

    tracing::info!("shutdown complete");
    Ok(())
}
