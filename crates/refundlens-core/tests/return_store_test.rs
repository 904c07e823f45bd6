//! Integration tests for the file-backed filing store and the demo scheduler.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use refundlens_core::{
    DemoReturnScheduler, FilingLookup, FilingStatus, LookupError, ReturnStore, Schedule,
    StorageError,
};

#[tokio::test]
async fn test_demo_returns_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("returns.db");

    let id = {
        let store = ReturnStore::open(Some(path.as_path())).unwrap();
        store.insert_demo_return().await.unwrap()
    };

    let store = ReturnStore::open(Some(path.as_path())).unwrap();
    let record = store.get_return(&id).await.unwrap();
    assert_eq!(record.return_id, id);
    assert_eq!(record.status, FilingStatus::Approved);
    assert_eq!(record.history.len(), 2);
    assert_eq!(record.snap_context, serde_json::json!({}));
}

#[tokio::test]
async fn test_lookup_distinguishes_missing_from_present() {
    let store = ReturnStore::open(None).unwrap();
    let id = store.insert_demo_return().await.unwrap();

    assert!(store.fetch_status(&id).await.is_ok());
    assert!(matches!(store.fetch_status("unknown-id").await, Err(LookupError::NotFound(_))));
    assert!(matches!(store.get_return("unknown-id").await, Err(StorageError::NotFound(_))));
}

#[tokio::test]
async fn test_scheduler_writes_through_store() {
    let store = ReturnStore::open(None).unwrap();
    let handle = DemoReturnScheduler::new(
        Arc::new(store.clone()),
        Schedule::Every(Duration::from_millis(10)),
    )
    .start();

    tokio::time::sleep(Duration::from_millis(80)).await;
    handle.shutdown().await;

    assert!(store.count().await.unwrap() >= 2);
}
