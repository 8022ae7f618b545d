//! Integration tests for the file-backed snapshot store: end-to-end writes
//! to a real temp directory, path traversal containment, and concurrent
//! access across independent keys.

use std::sync::Arc;

use taskwarden::{CommandId, FileSnapshotStore, SnapshotStore, SnapshotStoreExt, TaskId};

async fn store(dir: &std::path::Path) -> FileSnapshotStore {
    FileSnapshotStore::new(dir, "app").await.unwrap()
}

#[tokio::test]
async fn new_item_end_to_end_write() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path()).await;

    let task = TaskId::new("T").unwrap();
    let cmd = CommandId::new("C1").unwrap();
    let new_snapshot = serde_json::json!({"id": 42, "title": "new item"});

    store.save_raw(&task, &cmd, new_snapshot.clone()).await.unwrap();

    let expected_path = dir.path().join("app-task-t-c1.json");
    assert!(expected_path.exists());

    let on_disk: serde_json::Value =
        serde_json::from_slice(&tokio::fs::read(&expected_path).await.unwrap()).unwrap();
    assert_eq!(on_disk, new_snapshot);
}

#[tokio::test]
async fn path_traversal_attempt_creates_no_file_outside_base() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path()).await;

    let task = TaskId::new("../evil").unwrap();
    let cmd = CommandId::new("C1").unwrap();

    let result = store.save_raw(&task, &cmd, serde_json::json!({})).await;
    assert!(result.is_err());

    let escaped = dir.path().parent().unwrap().join("evil");
    assert!(!escaped.exists());

    let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
    let mut count = 0;
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 0, "no file should have been created inside the base dir either");
}

#[tokio::test]
async fn concurrent_writes_to_distinct_keys_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store(dir.path()).await);

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let task = TaskId::new(format!("T{i}")).unwrap();
            let cmd = CommandId::new("C1").unwrap();
            store
                .save::<serde_json::Value>(&task, &cmd, &serde_json::json!({"i": i}))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    for i in 0..20 {
        let task = TaskId::new(format!("T{i}")).unwrap();
        let cmd = CommandId::new("C1").unwrap();
        let loaded: Option<serde_json::Value> = store.load(&task, &cmd).await.unwrap();
        assert_eq!(loaded.unwrap()["i"], i);
    }
}

#[tokio::test]
async fn load_on_never_saved_key_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(dir.path()).await;

    let task = TaskId::new("UNSEEN").unwrap();
    let cmd = CommandId::new("C1").unwrap();

    let loaded: Option<serde_json::Value> = store.load(&task, &cmd).await.unwrap();
    assert!(loaded.is_none());
}
