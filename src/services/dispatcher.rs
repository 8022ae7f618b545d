//! The single coordinating actor of the service: owns the active-instance
//! map and the three inbox channels (submit, cancel, done), mirroring the
//! teacher's `MemoryDecayDaemon`/`DaemonHandle` split between a
//! long-running loop task and a handle callers interact with — generalized
//! here from a single scheduled job to an arbitrary-concurrency worker pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::{JoinHandle, JoinSet};

use crate::domain::errors::{CoreError, StartupError, SubmitError};
use crate::domain::models::command_config::{CommandConfig, NewSnapshotFn, TaskKindConfig};
use crate::domain::models::config::AppConfig;
use crate::domain::models::execution_context::ExecutionContext;
use crate::domain::models::ids::{CommandId, InstanceId, NotifierId, TaskId};
use crate::domain::models::submit_request::SubmitRequest;
use crate::domain::ports::notification_sender::NotificationSender;
use crate::domain::ports::snapshot_store::SnapshotStore;
use crate::domain::ports::task_handler::IsCancelled;
use crate::infrastructure::id_generator::IdGenerator;
use crate::services::registry::Registry;

struct ValidatedSubmission {
    req: SubmitRequest,
    kind: TaskKindConfig,
    command: CommandConfig,
}

/// Lifecycle-owning record for one live submission. Mutated only via its
/// `cancelled` flag; everything else is set once at construction.
struct ActiveInstance {
    task_id: TaskId,
    command_id: CommandId,
    notifier_id: Option<NotifierId>,
    cancelled: Arc<AtomicBool>,
}

/// The single coordinating actor. Construct one, call
/// [`Dispatcher::set_notification_sender`], then [`Dispatcher::start`].
pub struct Dispatcher {
    registry: Arc<Registry>,
    store: Arc<dyn SnapshotStore>,
    id_generator: Arc<IdGenerator>,
    config: AppConfig,
    sender: RwLock<Option<Arc<dyn NotificationSender>>>,

    submit_tx: mpsc::Sender<ValidatedSubmission>,
    submit_rx: AsyncMutex<Option<mpsc::Receiver<ValidatedSubmission>>>,
    cancel_tx: mpsc::Sender<InstanceId>,
    cancel_rx: AsyncMutex<Option<mpsc::Receiver<InstanceId>>>,
    done_tx: mpsc::Sender<InstanceId>,
    done_rx: AsyncMutex<Option<mpsc::Receiver<InstanceId>>>,

    started: AtomicBool,
    start_lock: std::sync::Mutex<()>,
    shutting_down: AtomicBool,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<dyn SnapshotStore>,
        id_generator: Arc<IdGenerator>,
        config: AppConfig,
    ) -> Self {
        let capacity = config.dispatcher.inbox_capacity;
        let (submit_tx, submit_rx) = mpsc::channel(capacity);
        let (cancel_tx, cancel_rx) = mpsc::channel(capacity);
        let (done_tx, done_rx) = mpsc::channel(capacity.max(1));

        Self {
            registry,
            store,
            id_generator,
            config,
            sender: RwLock::new(None),
            submit_tx,
            submit_rx: AsyncMutex::new(Some(submit_rx)),
            cancel_tx,
            cancel_rx: AsyncMutex::new(Some(cancel_rx)),
            done_tx,
            done_rx: AsyncMutex::new(Some(done_rx)),
            started: AtomicBool::new(false),
            start_lock: std::sync::Mutex::new(()),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Must be called before [`Dispatcher::start`].
    pub fn set_notification_sender(&self, sender: Arc<dyn NotificationSender>) {
        *self.sender.write().expect("dispatcher sender lock poisoned") = Some(sender);
    }

    fn current_sender(&self) -> Option<Arc<dyn NotificationSender>> {
        self.sender
            .read()
            .expect("dispatcher sender lock poisoned")
            .clone()
    }

    /// Synchronously validates `req` (field presence, registry lookup,
    /// notification-channel availability) then enqueues it. Does not wait
    /// for execution. Rejected once shutdown has begun — the loop stops
    /// polling `submit_rx` at that point, so anything still in flight
    /// here would otherwise sit unobserved until the channel is dropped.
    pub async fn submit(&self, req: SubmitRequest) -> Result<(), SubmitError> {
        req.validate()?;

        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(SubmitError::ShuttingDown);
        }

        if self.current_sender().is_none() {
            return Err(SubmitError::Validation(CoreError::InvalidInput(
                "notification sender not configured".into(),
            )));
        }

        let (kind, command) = self
            .registry
            .lookup(&req.task_id, &req.command_id)
            .map_err(CoreError::from)?;

        self.submit_tx
            .send(ValidatedSubmission { req, kind, command })
            .await
            .map_err(|_| SubmitError::Closed)
    }

    /// Enqueues a cancellation request. Unknown instance ids are reported
    /// by the loop via notification, not fatal to this call.
    pub async fn cancel(&self, instance_id: InstanceId) -> Result<(), SubmitError> {
        self.cancel_tx
            .send(instance_id)
            .await
            .map_err(|_| SubmitError::Closed)
    }

    /// Starts the dispatch loop on a fresh task, idempotent under a
    /// serializing lock. `shutdown` firing `true` begins orderly shutdown;
    /// the returned `JoinHandle` resolves once every worker has finished,
    /// standing in for a `WaitGroup` in languages that have one.
    pub fn start(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, StartupError> {
        let _guard = self.start_lock.lock().expect("dispatcher start lock poisoned");

        if self.current_sender().is_none() {
            return Err(StartupError::NotificationSenderUnset);
        }

        if self.started.swap(true, Ordering::SeqCst) {
            return Err(StartupError::AlreadyRunning);
        }

        let submit_rx = self
            .submit_rx
            .try_lock()
            .expect("submit receiver uncontended at startup")
            .take()
            .expect("dispatcher already started");
        let cancel_rx = self
            .cancel_rx
            .try_lock()
            .expect("cancel receiver uncontended at startup")
            .take()
            .expect("dispatcher already started");
        let done_rx = self
            .done_rx
            .try_lock()
            .expect("done receiver uncontended at startup")
            .take()
            .expect("dispatcher already started");

        let dispatcher = self.clone();
        Ok(tokio::spawn(async move {
            dispatcher.run_loop(submit_rx, cancel_rx, done_rx, shutdown).await;
        }))
    }

    async fn run_loop(
        self: Arc<Self>,
        mut submit_rx: mpsc::Receiver<ValidatedSubmission>,
        mut cancel_rx: mpsc::Receiver<InstanceId>,
        mut done_rx: mpsc::Receiver<InstanceId>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut active: HashMap<InstanceId, ActiveInstance> = HashMap::new();
        let mut workers: JoinSet<()> = JoinSet::new();
        let mut shutting_down = false;

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed(), if !shutting_down => {
                    if changed.is_ok() && *shutdown.borrow() {
                        shutting_down = true;
                        self.shutting_down.store(true, Ordering::SeqCst);
                        for instance in active.values() {
                            instance.cancelled.store(true, Ordering::SeqCst);
                        }
                    }
                }

                Some(validated) = submit_rx.recv(), if !shutting_down => {
                    self.handle_submit(&mut active, &mut workers, validated).await;
                }

                Some(instance_id) = cancel_rx.recv() => {
                    self.handle_cancel(&active, instance_id).await;
                }

                Some(instance_id) = done_rx.recv() => {
                    if active.remove(&instance_id).is_none() {
                        tracing::warn!(%instance_id, "done signal for unknown instance");
                    }
                }

                Some(result) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(join_err) = result {
                        if join_err.is_panic() {
                            tracing::error!(error = ?join_err, "worker task panicked");
                            if let Some(sender) = self.current_sender() {
                                sender
                                    .notify_default("internal error: a task worker panicked")
                                    .await;
                            }
                        }
                    }
                }
            }

            if shutting_down && active.is_empty() {
                break;
            }
        }

        while workers.join_next().await.is_some() {}
    }

    async fn handle_submit(
        &self,
        active: &mut HashMap<InstanceId, ActiveInstance>,
        workers: &mut JoinSet<()>,
        validated: ValidatedSubmission,
    ) {
        let ValidatedSubmission { req, kind, command } = validated;

        if !command.allow_multiple {
            let existing = active.iter().find(|(_, instance)| {
                instance.task_id == req.task_id
                    && instance.command_id == req.command_id
                    && !instance.cancelled.load(Ordering::SeqCst)
            });
            if let Some((existing_id, _)) = existing {
                let message = format!(
                    "{} {} is already running as instance {existing_id}; cancel it to run again",
                    req.task_id, req.command_id
                );
                self.notify_requester(&req, &message).await;
                return;
            }
        }

        let mut instance_id = self.id_generator.next();
        while active.contains_key(&instance_id) {
            instance_id = self.id_generator.next();
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        active.insert(
            instance_id.clone(),
            ActiveInstance {
                task_id: req.task_id.clone(),
                command_id: req.command_id.clone(),
                notifier_id: req.notifier_id.clone(),
                cancelled: cancelled.clone(),
            },
        );

        let is_cancelled: IsCancelled = {
            let cancelled = cancelled.clone();
            Arc::new(move || cancelled.load(Ordering::SeqCst))
        };

        let handler = (kind.new_task)(&instance_id, &req, &self.config, is_cancelled.clone());

        if req.notify_on_start {
            let message = format!(
                "{} {} started as instance {instance_id}",
                req.task_id, req.command_id
            );
            self.notify_requester(&req, &message).await;
        }

        let sender = self
            .current_sender()
            .expect("notification sender set before start");
        let args = WorkerArgs {
            instance_id,
            task_id: req.task_id.clone(),
            command_id: req.command_id.clone(),
            notifier_id: req.notifier_id.clone(),
            base_context: req.context.clone().unwrap_or_default(),
            handler,
            store: self.store.clone(),
            sender,
            new_snapshot: command.new_snapshot.clone(),
            is_cancelled,
            done_tx: self.done_tx.clone(),
        };
        workers.spawn(run_worker(args));
    }

    async fn handle_cancel(&self, active: &HashMap<InstanceId, ActiveInstance>, instance_id: InstanceId) {
        match active.get(&instance_id) {
            Some(instance) => {
                instance.cancelled.store(true, Ordering::SeqCst);
                let message = format!("instance {instance_id} cancelled by user");
                self.notify_via(
                    instance.notifier_id.as_ref(),
                    instance.task_id.clone(),
                    instance.command_id.clone(),
                    &message,
                )
                .await;
            }
            None => {
                if let Some(sender) = self.current_sender() {
                    sender
                        .notify_default(&format!("cancel requested for unknown instance {instance_id}"))
                        .await;
                }
            }
        }
    }

    async fn notify_requester(&self, req: &SubmitRequest, message: &str) {
        self.notify_via(
            req.notifier_id.as_ref(),
            req.task_id.clone(),
            req.command_id.clone(),
            message,
        )
        .await;
    }

    async fn notify_via(
        &self,
        notifier_id: Option<&NotifierId>,
        task_id: TaskId,
        command_id: CommandId,
        message: &str,
    ) {
        let Some(sender) = self.current_sender() else {
            return;
        };
        match notifier_id {
            Some(notifier_id) => {
                let ctx = ExecutionContext::new()
                    .with_task(task_id.clone(), command_id.clone())
                    .with_title(format!("{task_id}/{command_id}"));
                sender.notify(&ctx, notifier_id, message).await;
            }
            None => {
                sender.notify_default(message).await;
            }
        }
    }
}

struct WorkerArgs {
    instance_id: InstanceId,
    task_id: TaskId,
    command_id: CommandId,
    notifier_id: Option<NotifierId>,
    base_context: ExecutionContext,
    handler: Arc<dyn crate::domain::ports::task_handler::TaskHandler>,
    store: Arc<dyn SnapshotStore>,
    sender: Arc<dyn NotificationSender>,
    new_snapshot: NewSnapshotFn,
    is_cancelled: IsCancelled,
    done_tx: mpsc::Sender<InstanceId>,
}

/// Guarantees a done signal is delivered for `instance_id` even if the
/// worker body panics: the guard's `Drop` fires during unwinding and
/// performs a best-effort, non-blocking send. The happy path takes the id
/// out before returning so the guard becomes a no-op.
struct DoneGuard {
    done_tx: mpsc::Sender<InstanceId>,
    instance_id: Option<InstanceId>,
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        if let Some(instance_id) = self.instance_id.take() {
            let _ = self.done_tx.try_send(instance_id);
        }
    }
}

async fn run_worker(args: WorkerArgs) {
    let WorkerArgs {
        instance_id,
        task_id,
        command_id,
        notifier_id,
        base_context,
        handler,
        store,
        sender,
        new_snapshot,
        is_cancelled,
        done_tx,
    } = args;

    let mut guard = DoneGuard {
        done_tx: done_tx.clone(),
        instance_id: Some(instance_id.clone()),
    };

    let start = tokio::time::Instant::now();
    let ctx = base_context
        .with_task(task_id.clone(), command_id.clone())
        .with_title(format!("{task_id}/{command_id}"));

    let supports_html = match &notifier_id {
        Some(notifier_id) => sender.supports_html(notifier_id).await,
        None => false,
    };

    let empty_shape = new_snapshot();
    if empty_shape.is_null() {
        notify(&sender, &notifier_id, &ctx, "task is unhealthy: snapshot factory returned null").await;
        finish(&mut guard, done_tx, instance_id).await;
        return;
    }

    let prior = match store.load_raw(&task_id, &command_id).await {
        Ok(Some(value)) => value,
        Ok(None) => empty_shape,
        Err(err) => {
            notify(
                &sender,
                &notifier_id,
                &ctx,
                &format!("warning: could not load prior snapshot ({err}); continuing from an empty baseline"),
            )
            .await;
            empty_shape
        }
    };

    let outcome = handler.execute(prior, supports_html, is_cancelled.clone()).await;

    if is_cancelled() {
        finish(&mut guard, done_tx, instance_id).await;
        return;
    }

    match outcome {
        Err(err) => {
            let elapsed = start.elapsed();
            let ctx = ctx.with_instance_id(instance_id.clone(), elapsed).with_error(true);
            notify(&sender, &notifier_id, &ctx, &format!("{task_id}/{command_id} failed: {err}")).await;
        }
        Ok(outcome) => {
            let elapsed = start.elapsed();
            let ctx = ctx.with_instance_id(instance_id.clone(), elapsed);

            if !outcome.message.is_empty() {
                notify(&sender, &notifier_id, &ctx, &outcome.message).await;
            }

            if let Some(new_snapshot) = outcome.new_snapshot {
                if let Err(err) = store.save_raw(&task_id, &command_id, new_snapshot).await {
                    let ctx = ctx.with_error(true);
                    notify(
                        &sender,
                        &notifier_id,
                        &ctx,
                        &format!("{task_id}/{command_id}: failed to save new snapshot: {err}"),
                    )
                    .await;
                }
            }
        }
    }

    finish(&mut guard, done_tx, instance_id).await;
}

async fn finish(guard: &mut DoneGuard, done_tx: mpsc::Sender<InstanceId>, instance_id: InstanceId) {
    guard.instance_id = None;
    let _ = done_tx.send(instance_id).await;
}

async fn notify(
    sender: &Arc<dyn NotificationSender>,
    notifier_id: &Option<NotifierId>,
    ctx: &ExecutionContext,
    message: &str,
) {
    match notifier_id {
        Some(notifier_id) => {
            sender.notify(ctx, notifier_id, message).await;
        }
        None => {
            sender.notify_default(message).await;
        }
    }
}
