pub mod notification_sender;
pub mod snapshot_store;
pub mod task_handler;

pub use notification_sender::NotificationSender;
pub use snapshot_store::{SnapshotStore, SnapshotStoreExt};
pub use task_handler::{ExecuteOutcome, IsCancelled, TaskHandler};
