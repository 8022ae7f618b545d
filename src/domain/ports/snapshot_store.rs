//! Durable `(TaskId, CommandId) -> Snapshot` store.
//!
//! The store itself is opaque to the snapshot's concrete shape — it
//! speaks `serde_json::Value` at its boundary. [`SnapshotStoreExt`]
//! layers a typed façade on top (load into / save from a caller-chosen
//! `T`), which is the generic-language alternative the specification's
//! design notes explicitly call out in place of the reference
//! implementation's mutate-by-reference `into` parameter.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::errors::StorageError;
use crate::domain::models::ids::{CommandId, TaskId};

/// Raw, shape-erased store operations.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the raw JSON value for `(task_id, command_id)`. A missing
    /// key is success with `Ok(None)` — never an error.
    async fn load_raw(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
    ) -> Result<Option<serde_json::Value>, StorageError>;

    /// Atomically replace the value stored for `(task_id, command_id)`.
    async fn save_raw(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        value: serde_json::Value,
    ) -> Result<(), StorageError>;

    /// Best-effort sweep of orphaned temp files left by a prior crash
    /// mid-write. Called once at construction.
    async fn cleanup_orphan_temp_files(&self);
}

/// Typed convenience wrapper over [`SnapshotStore`].
#[async_trait]
pub trait SnapshotStoreExt: SnapshotStore {
    /// Deserialize the stored value into `T`. Returns `Ok(None)` on a
    /// missing key — the caller keeps using its own default/empty `T`.
    async fn load<T>(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
    ) -> Result<Option<T>, StorageError>
    where
        T: DeserializeOwned,
    {
        match self.load_raw(task_id, command_id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and persist it atomically.
    async fn save<T>(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        value: &T,
    ) -> Result<(), StorageError>
    where
        T: Serialize + Sync,
    {
        let encoded = serde_json::to_value(value)?;
        self.save_raw(task_id, command_id, encoded).await
    }
}

impl<S: SnapshotStore + ?Sized> SnapshotStoreExt for S {}
