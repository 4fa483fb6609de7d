//! Record store tests, run against both backends

use std::sync::Arc;

use deployify::deploy::fsm::DeploymentStatus;
use deployify::errors::DeployError;
use deployify::filesys::dir::Dir;
use deployify::models::deployment::{
    Budget, DeploymentRequest, Environment, LogEntry, LogLevel, RecordUpdate,
};
use deployify::store::{DeploymentStore, FileStore, MemoryStore};
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

fn request() -> DeploymentRequest {
    DeploymentRequest::new("https://github.com/x/site", Environment::Staging, Budget::Low)
}

async fn backends(root: &TempDir) -> Vec<Arc<dyn DeploymentStore>> {
    let file = FileStore::open(Dir::new(root.path().join("records")))
        .await
        .unwrap();
    vec![Arc::new(MemoryStore::new()), Arc::new(file)]
}

#[tokio::test]
async fn test_create_starts_queued() {
    let root = TempDir::new().unwrap();
    for store in backends(&root).await {
        let id = store.create(&request()).await.unwrap();
        let record = store.get(&id).await.unwrap();

        assert_eq!(record.id, id);
        assert_eq!(record.status, DeploymentStatus::Queued);
        assert_eq!(record.branch, "main");
        assert_eq!(record.environment, Environment::Staging);
        assert!(record.logs.is_empty());
        assert!(record.provider.is_none());
    }
}

#[tokio::test]
async fn test_update_merges_fields() {
    let root = TempDir::new().unwrap();
    for store in backends(&root).await {
        let id = store.create(&request()).await.unwrap();
        store
            .update_status(&id, DeploymentStatus::Cloning, RecordUpdate::default())
            .await
            .unwrap();
        store
            .update_status(&id, DeploymentStatus::Detecting, RecordUpdate::default())
            .await
            .unwrap();
        let record = store
            .update_status(
                &id,
                DeploymentStatus::Building,
                RecordUpdate {
                    provider: Some("netlify".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.status, DeploymentStatus::Building);
        assert_eq!(record.provider.as_deref(), Some("netlify"));
        assert!(record.updated_at >= record.created_at);

        // fields not named in an update are kept
        let record = store
            .update_status(&id, DeploymentStatus::Building, RecordUpdate::default())
            .await
            .unwrap();
        assert_eq!(record.provider.as_deref(), Some("netlify"));
    }
}

#[tokio::test]
async fn test_terminal_records_reject_updates() {
    let root = TempDir::new().unwrap();
    for store in backends(&root).await {
        let id = store.create(&request()).await.unwrap();
        let cancelled = assert_ok!(store.cancel(&id).await);
        assert_eq!(cancelled.status, DeploymentStatus::Cancelled);
        assert!(cancelled.completed_at.is_some());

        let err = assert_err!(
            store
                .update_status(&id, DeploymentStatus::Cloning, RecordUpdate::default())
                .await
        );
        assert!(matches!(err, DeployError::InvalidTransition { .. }));
        assert_err!(store.cancel(&id).await);
        assert_eq!(store.get(&id).await.unwrap().status, DeploymentStatus::Cancelled);
    }
}

#[tokio::test]
async fn test_backwards_transition_rejected() {
    let root = TempDir::new().unwrap();
    for store in backends(&root).await {
        let id = store.create(&request()).await.unwrap();
        store
            .update_status(&id, DeploymentStatus::Cloning, RecordUpdate::default())
            .await
            .unwrap();
        let err = store
            .update_status(&id, DeploymentStatus::Queued, RecordUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DeployError::InvalidTransition { .. }));
    }
}

#[tokio::test]
async fn test_logs_keep_append_order() {
    let root = TempDir::new().unwrap();
    for store in backends(&root).await {
        let id = store.create(&request()).await.unwrap();
        for (level, message) in [
            (LogLevel::Info, "first"),
            (LogLevel::Warn, "second"),
            (LogLevel::Error, "third"),
        ] {
            store.append_log(&id, LogEntry::new(level, message)).await.unwrap();
        }

        let record = store.get(&id).await.unwrap();
        let messages: Vec<&str> = record.logs.iter().map(|l| l.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(record.logs[1].level, LogLevel::Warn);
    }
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let root = TempDir::new().unwrap();
    for store in backends(&root).await {
        assert!(matches!(
            store.get("missing").await,
            Err(DeployError::NotFound(_))
        ));
        assert!(matches!(
            store.append_log("missing", LogEntry::new(LogLevel::Info, "x")).await,
            Err(DeployError::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn test_file_store_survives_reopen() {
    let root = TempDir::new().unwrap();
    let dir = Dir::new(root.path().join("records"));

    let id = {
        let store = FileStore::open(dir.clone()).await.unwrap();
        let id = store.create(&request()).await.unwrap();
        store
            .append_log(&id, LogEntry::new(LogLevel::Info, "queued"))
            .await
            .unwrap();
        id
    };

    let reopened = FileStore::open(dir).await.unwrap();
    let record = reopened.get(&id).await.unwrap();
    assert_eq!(record.status, DeploymentStatus::Queued);
    assert_eq!(record.logs.len(), 1);
}

#[tokio::test]
async fn test_file_store_rejects_path_like_ids() {
    let root = TempDir::new().unwrap();
    let store = FileStore::open(Dir::new(root.path().join("records")))
        .await
        .unwrap();
    assert!(matches!(
        store.get("../settings").await,
        Err(DeployError::NotFound(_))
    ));
}
