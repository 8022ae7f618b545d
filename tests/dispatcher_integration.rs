//! Black-box dispatcher scenarios driven only through the public API,
//! covering the concrete scenarios from the specification's testable
//! properties: duplicate submission rejection, graceful shutdown draining
//! in-flight instances, and an unknown-instance cancel.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};

use taskwarden::{
    CommandConfig, CommandId, CoreError, Dispatcher, ExecuteOutcome, ExecutionContext,
    FileSnapshotStore, IdGenerator, InstanceId, IsCancelled, NotificationSender, NotifierId,
    Registry, RunBy, SnapshotStore, SubmitRequest, TaskHandler, TaskId, TaskKindConfig,
};

#[derive(Default)]
struct RecordingSender {
    messages: std::sync::Mutex<Vec<String>>,
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn notify(&self, _ctx: &ExecutionContext, _notifier_id: &NotifierId, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        true
    }

    async fn notify_default(&self, message: &str) -> bool {
        self.messages.lock().unwrap().push(message.to_string());
        true
    }

    async fn supports_html(&self, _notifier_id: &NotifierId) -> bool {
        false
    }
}

struct BlockingHandler {
    release: Arc<Notify>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl TaskHandler for BlockingHandler {
    async fn execute(
        &self,
        _prior: serde_json::Value,
        _supports_html: bool,
        _is_cancelled: IsCancelled,
    ) -> Result<ExecuteOutcome, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        Ok(ExecuteOutcome::changed("late", serde_json::json!({"late": true})))
    }
}

async fn build(dir: &std::path::Path) -> (Arc<Dispatcher>, Arc<RecordingSender>) {
    let store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(dir, "app").await.unwrap());
    let registry = Arc::new(Registry::new());

    let release = Arc::new(Notify::new());
    let calls = Arc::new(AtomicUsize::new(0));
    registry.register(
        TaskId::new("T").unwrap(),
        TaskKindConfig::new(
            vec![
                CommandConfig::new(CommandId::new("C1").unwrap(), false, Arc::new(|| serde_json::json!({}))),
                CommandConfig::new(CommandId::new("C2").unwrap(), true, Arc::new(|| serde_json::json!({}))),
            ],
            Arc::new(move |_iid, _req, _cfg, _is_cancelled| -> Arc<dyn TaskHandler> {
                Arc::new(BlockingHandler {
                    release: release.clone(),
                    calls: calls.clone(),
                })
            }),
        ),
    );

    let dispatcher = Arc::new(Dispatcher::new(
        registry,
        store,
        Arc::new(IdGenerator::new()),
        taskwarden::AppConfig::default(),
    ));
    let sender = Arc::new(RecordingSender::default());
    dispatcher.set_notification_sender(sender.clone());
    (dispatcher, sender)
}

#[tokio::test]
async fn duplicate_submission_of_an_allow_multiple_false_command_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, sender) = build(dir.path()).await;

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let _handle = dispatcher.start(shutdown_rx).unwrap();

    let req = SubmitRequest::new(TaskId::new("T").unwrap(), CommandId::new("C1").unwrap(), RunBy::User)
        .with_notify_on_start(true);
    dispatcher.submit(req.clone()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    dispatcher.submit(req).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = sender.messages.lock().unwrap().clone();
    let started_count = messages.iter().filter(|m| m.contains("started as instance")).count();
    let already_running_count = messages.iter().filter(|m| m.contains("already running")).count();

    assert_eq!(started_count, 1, "only the first submission should spawn a worker");
    assert_eq!(already_running_count, 1, "the second should be rejected with an already-running notice");
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_instances_to_drain() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, sender) = build(dir.path()).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = dispatcher.start(shutdown_rx).unwrap();

    let req = SubmitRequest::new(TaskId::new("T").unwrap(), CommandId::new("C2").unwrap(), RunBy::Scheduler)
        .with_notify_on_start(true);
    dispatcher.submit(req).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = sender
        .messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("started as instance"));
    assert!(started);

    shutdown_tx.send(true).unwrap();

    // The worker is still blocked on BlockingHandler's release signal, so
    // the dispatcher loop must not have finished yet.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished(), "shutdown must wait for the in-flight worker");
}

#[tokio::test]
async fn submit_after_shutdown_signal_is_rejected_not_silently_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, _sender) = build(dir.path()).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let _handle = dispatcher.start(shutdown_rx).unwrap();

    shutdown_tx.send(true).unwrap();
    // Give the loop a chance to observe the shutdown signal.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let req = SubmitRequest::new(TaskId::new("T").unwrap(), CommandId::new("C1").unwrap(), RunBy::User);
    let result = dispatcher.submit(req).await;
    assert!(
        matches!(result, Err(taskwarden::SubmitError::ShuttingDown)),
        "submit during shutdown must fail instead of returning Ok and silently dropping"
    );
}

#[tokio::test]
async fn cancel_on_unknown_instance_notifies_default_channel_without_crashing() {
    let dir = tempfile::tempdir().unwrap();
    let (dispatcher, sender) = build(dir.path()).await;

    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let _handle = dispatcher.start(shutdown_rx).unwrap();

    let bogus_id = InstanceId::from_str("does-not-exist").unwrap();
    dispatcher.cancel(bogus_id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let messages = sender.messages.lock().unwrap().clone();
    assert!(messages.iter().any(|m| m.contains("unknown instance")));
}
