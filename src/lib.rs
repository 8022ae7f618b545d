//! Taskwarden - task execution core for a background change-watching
//! notification service.
//!
//! - Registry: catalog of task kinds and their commands.
//! - Dispatcher: the single coordinating actor that enforces concurrency
//!   policy and runs workers.
//! - SnapshotStore: durable `(TaskID, CommandID) -> Snapshot` persistence.
//! - ExecutionContext: immutable metadata carrier for notification
//!   formatting, composed with a standard cancellable/deadline signal.
//!
//! Concrete notification transports, the scheduler that produces periodic
//! submissions, and individual task kinds live outside this crate; it only
//! depends on the capability contracts they satisfy.

pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{CoreError, CoreResult, SubmitError};
pub use domain::models::{
    AppConfig, CommandConfig, CommandId, ContextError, ExecutionContext, InstanceId, NotifierId,
    RunBy, SubmitRequest, TaskId, TaskKindConfig,
};
pub use domain::ports::{
    ExecuteOutcome, IsCancelled, NotificationSender, SnapshotStore, SnapshotStoreExt, TaskHandler,
};
pub use infrastructure::{ConfigLoader, FileSnapshotStore, IdGenerator, LoggerImpl};
pub use services::{Dispatcher, Registry};
