//! File-backed realization of [`SnapshotStore`]: one JSON file per
//! `(task_id, command_id)`, written atomically via a temp-sibling +
//! rename, with per-key mutual exclusion and base-directory containment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::domain::errors::StorageError;
use crate::domain::models::ids::{CommandId, TaskId};
use crate::domain::ports::snapshot_store::SnapshotStore;

const TEMP_FILE_PREFIX: &str = "task-result-";
const TEMP_FILE_SUFFIX: &str = ".tmp";

/// Converts an identifier to snake_case, then replaces underscores with
/// hyphens, per the specification's key-derivation rule.
fn normalize_key_segment(raw: &str) -> String {
    let mut snake = String::with_capacity(raw.len() + 4);
    let mut prev_is_lower_or_digit = false;
    for ch in raw.chars() {
        if ch.is_uppercase() {
            if prev_is_lower_or_digit {
                snake.push('_');
            }
            snake.extend(ch.to_lowercase());
            prev_is_lower_or_digit = false;
        } else if ch.is_alphanumeric() {
            snake.push(ch);
            prev_is_lower_or_digit = ch.is_lowercase() || ch.is_ascii_digit();
        } else {
            snake.push('_');
            prev_is_lower_or_digit = false;
        }
    }
    snake.replace('_', "-")
}

/// Per-key lock registry, striped by filename so different keys never
/// block each other while same-key writes/reads are fully serialized.
#[derive(Default)]
struct KeyLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    fn lock_for(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("key lock registry poisoned");
        locks.entry(key.to_string()).or_default().clone()
    }
}

/// File-backed [`SnapshotStore`].
pub struct FileSnapshotStore {
    base_dir: PathBuf,
    app_name: String,
    key_locks: KeyLocks,
}

impl FileSnapshotStore {
    /// Creates the base directory if missing and sweeps orphan temp
    /// files left by a prior crash mid-write.
    pub async fn new(base_dir: impl Into<PathBuf>, app_name: impl Into<String>) -> Result<Self, StorageError> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir).await?;
        let store = Self {
            base_dir,
            app_name: app_name.into(),
            key_locks: KeyLocks::default(),
        };
        store.cleanup_orphan_temp_files().await;
        Ok(store)
    }

    fn file_name(&self, task_id: &TaskId, command_id: &CommandId) -> String {
        format!(
            "{}-task-{}-{}.json",
            self.app_name,
            normalize_key_segment(task_id.as_str()),
            normalize_key_segment(command_id.as_str())
        )
    }

    /// Resolves and verifies the target path is a descendant of
    /// `base_dir`, rejecting any `../` traversal attempt regardless of
    /// what made it into the raw identifiers.
    fn resolve_path(&self, task_id: &TaskId, command_id: &CommandId) -> Result<PathBuf, StorageError> {
        // Reject a raw traversal attempt up front; the snake-case/hyphen
        // normalization below would otherwise neutralize it silently,
        // which would hide an attempted attack instead of surfacing it.
        if task_id.as_str().contains("..") || command_id.as_str().contains("..") {
            return Err(StorageError::PathTraversal(format!(
                "{}/{}",
                task_id, command_id
            )));
        }

        let file_name = self.file_name(task_id, command_id);
        let candidate = self.base_dir.join(&file_name);

        let base = self.base_dir.as_path();
        if !is_descendant(base, &candidate) {
            return Err(StorageError::PathTraversal(format!(
                "{}/{}",
                task_id, command_id
            )));
        }
        Ok(candidate)
    }

    fn temp_path(&self) -> PathBuf {
        let unique = format!(
            "{}{}{}",
            TEMP_FILE_PREFIX,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or_default()
        );
        self.base_dir.join(format!("{unique}{TEMP_FILE_SUFFIX}"))
    }
}

/// Lexical containment check: join-then-normalize without requiring the
/// file to exist yet (`canonicalize` would fail on a not-yet-created
/// path), rejecting any path whose normalized components escape `base`.
fn is_descendant(base: &Path, candidate: &Path) -> bool {
    let mut normalized = PathBuf::new();
    for component in candidate.components() {
        use std::path::Component;
        match component {
            Component::ParentDir => {
                if !normalized.pop() {
                    return false;
                }
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized.starts_with(base)
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load_raw(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
    ) -> Result<Option<serde_json::Value>, StorageError> {
        let path = self.resolve_path(task_id, command_id)?;
        let lock = self
            .key_locks
            .lock_for(&path.to_string_lossy());
        let _guard = lock.lock().await;

        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    async fn save_raw(
        &self,
        task_id: &TaskId,
        command_id: &CommandId,
        value: serde_json::Value,
    ) -> Result<(), StorageError> {
        let path = self.resolve_path(task_id, command_id)?;
        let lock = self
            .key_locks
            .lock_for(&path.to_string_lossy());
        let _guard = lock.lock().await;

        let encoded = encode_tabbed_json(&value)?;
        let temp_path = self.temp_path();

        let write_result = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&encoded).await?;
            file.sync_all().await?;
            drop(file);

            match fs::rename(&temp_path, &path).await {
                Ok(()) => Ok(()),
                Err(_) => {
                    // Platforms where rename-over-existing fails: remove
                    // the target first, then retry the rename.
                    let _ = fs::remove_file(&path).await;
                    fs::rename(&temp_path, &path).await
                }
            }
        }
        .await;

        if write_result.is_err() {
            let _ = fs::remove_file(&temp_path).await;
        }

        write_result.map_err(StorageError::Io)
    }

    async fn cleanup_orphan_temp_files(&self) {
        let Ok(mut entries) = fs::read_dir(&self.base_dir).await else {
            return;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(TEMP_FILE_PREFIX) && name.ends_with(TEMP_FILE_SUFFIX) {
                let _ = fs::remove_file(entry.path()).await;
            }
        }
    }
}

/// Tab-indented JSON encoding, per the specification's file format.
fn encode_tabbed_json(value: &serde_json::Value) -> Result<Vec<u8>, serde_json::Error> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(value, &mut ser)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::snapshot_store::SnapshotStoreExt;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
    struct Widget {
        count: u32,
        label: String,
    }

    async fn store() -> (FileSnapshotStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path(), "app").await.unwrap();
        (store, dir)
    }

    #[test]
    fn normalizes_camel_case_and_hyphenates() {
        assert_eq!(normalize_key_segment("watchNew"), "watch-new");
        assert_eq!(normalize_key_segment("NAVER"), "naver");
    }

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let (store, _dir) = store().await;
        let task = TaskId::new("NAVER").unwrap();
        let cmd = CommandId::new("watch").unwrap();
        let loaded: Option<Widget> = store.load(&task, &cmd).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn round_trips_a_value() {
        let (store, _dir) = store().await;
        let task = TaskId::new("NAVER").unwrap();
        let cmd = CommandId::new("watch").unwrap();
        let widget = Widget {
            count: 3,
            label: "hi".into(),
        };

        store.save(&task, &cmd, &widget).await.unwrap();
        let loaded: Option<Widget> = store.load(&task, &cmd).await.unwrap();
        assert_eq!(loaded, Some(widget));
    }

    #[tokio::test]
    async fn file_name_follows_template() {
        let (store, dir) = store().await;
        let task = TaskId::new("NAVER").unwrap();
        let cmd = CommandId::new("watchNew").unwrap();
        store.save_raw(&task, &cmd, serde_json::json!({"a": 1})).await.unwrap();

        let expected = dir.path().join("app-task-naver-watch-new.json");
        assert!(expected.exists());
    }

    #[tokio::test]
    async fn path_traversal_is_rejected() {
        let (store, _dir) = store().await;
        let task = TaskId::new("../evil").unwrap();
        let cmd = CommandId::new("watch").unwrap();

        let result = store.save_raw(&task, &cmd, serde_json::json!({})).await;
        assert!(matches!(result, Err(StorageError::PathTraversal(_))));
    }

    #[tokio::test]
    async fn temp_files_are_cleaned_up_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let orphan = dir.path().join("task-result-orphan.tmp");
        tokio::fs::write(&orphan, b"partial").await.unwrap();

        let _store = FileSnapshotStore::new(dir.path(), "app").await.unwrap();
        assert!(!orphan.exists());
    }

    #[tokio::test]
    async fn concurrent_saves_to_same_key_leave_one_consistent_value() {
        let (store, _dir) = store().await;
        let store = Arc::new(store);
        let task = TaskId::new("NAVER").unwrap();
        let cmd = CommandId::new("watch").unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let store = store.clone();
            let task = task.clone();
            let cmd = cmd.clone();
            handles.push(tokio::spawn(async move {
                store
                    .save_raw(&task, &cmd, serde_json::json!({"writer": i}))
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        let loaded = store.load_raw(&task, &cmd).await.unwrap().unwrap();
        let writer = loaded.get("writer").and_then(serde_json::Value::as_i64);
        assert!(writer.is_some());
    }
}
