//! MemoryRemoteStore behaviour the coordinator relies on.

use serde_json::{json, Value};

use bizdash_sync::error::RemoteError;
use bizdash_sync::remote::{CreateOp, MemoryRemoteStore, QueryFilter, RemoteOp, RemoteStore};
use bizdash_sync::types::{Discriminator, FieldMap, Record};

fn fields(v: Value) -> FieldMap {
    v.as_object().cloned().unwrap()
}

fn record(v: Value) -> Record {
    serde_json::from_value(v).unwrap()
}

#[tokio::test]
async fn subscribe_delivers_initial_snapshot_then_changes() {
    let store = MemoryRemoteStore::new();
    store.insert("clients", record(json!({"id": "doc-a", "ownerId": "u1"})));

    let mut stream = store
        .subscribe("clients", &QueryFilter::owner("u1"))
        .await
        .unwrap();
    let initial = stream.next().await.unwrap().unwrap();
    assert_eq!(initial.len(), 1);

    let id = store
        .create("clients", CreateOp::new("u1", fields(json!({"label": "B"}))))
        .await
        .unwrap();
    let next = stream.next().await.unwrap().unwrap();
    assert_eq!(next.len(), 2);
    assert!(next.iter().any(|r| r.id == id));
}

#[tokio::test]
async fn snapshots_are_filtered_by_owner_and_discriminator() {
    let store = MemoryRemoteStore::new();
    store.insert(
        "finance",
        record(json!({"id": "p1", "ownerId": "u1", "itemType": "payment"})),
    );
    store.insert(
        "finance",
        record(json!({"id": "e1", "ownerId": "u1", "itemType": "entry"})),
    );
    store.insert(
        "finance",
        record(json!({"id": "p2", "ownerId": "u2", "itemType": "payment"})),
    );

    let filter = QueryFilter::owner("u1")
        .with_discriminator(Some(Discriminator::new("itemType", "payment")));
    let docs = store.query("finance", &filter).await.unwrap();
    let ids: Vec<&str> = docs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["p1"]);
}

#[tokio::test]
async fn failed_batch_writes_nothing() {
    let store = MemoryRemoteStore::new();
    store.fail_next(RemoteOp::BatchCommit, RemoteError::transport("aborted"));
    let ops = vec![
        CreateOp::new("u1", fields(json!({"n": 1}))),
        CreateOp::new("u1", fields(json!({"n": 2}))),
    ];
    assert!(store.batch_commit("clients", ops.clone()).await.is_err());
    assert!(store.documents("clients").is_empty());

    let ids = store.batch_commit("clients", ops).await.unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(store.documents("clients").len(), 2);
    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].count, 2);
}

#[tokio::test]
async fn update_of_missing_document_is_not_found() {
    let store = MemoryRemoteStore::new();
    let err = store
        .update("clients", "doc-x", fields(json!({"n": 1})))
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound { .. }));
}

#[tokio::test]
async fn delete_of_missing_document_succeeds() {
    let store = MemoryRemoteStore::new();
    store.delete("clients", "doc-x").await.unwrap();
    assert_eq!(store.call_count(RemoteOp::Delete), 1);
}

#[tokio::test]
async fn update_merges_partial_fields() {
    let store = MemoryRemoteStore::new();
    store.insert(
        "clients",
        record(json!({"id": "doc-a", "ownerId": "u1", "label": "A", "value": "1"})),
    );
    store
        .update("clients", "doc-a", fields(json!({"value": "2", "ownerId": "u9"})))
        .await
        .unwrap();
    let doc = store.document("clients", "doc-a").unwrap();
    assert_eq!(doc.get("label"), Some(&json!("A")));
    assert_eq!(doc.get("value"), Some(&json!("2")));
    assert_eq!(doc.owner_id.as_deref(), Some("u1"));
}

#[tokio::test]
async fn cancelled_stream_unregisters_subscriber() {
    let store = MemoryRemoteStore::new();
    let stream = store
        .subscribe("clients", &QueryFilter::owner("u1"))
        .await
        .unwrap();
    assert_eq!(store.subscriber_count(), 1);
    stream.cancel();
    assert_eq!(store.subscriber_count(), 0);
}

#[tokio::test]
async fn broken_subscription_delivers_error_and_closes() {
    let store = MemoryRemoteStore::new();
    let mut stream = store
        .subscribe("clients", &QueryFilter::owner("u1"))
        .await
        .unwrap();
    stream.next().await.unwrap().unwrap();

    store.break_subscriptions("clients", RemoteError::permission_denied("rules"));
    let event = stream.next().await.unwrap();
    assert!(matches!(event, Err(e) if e.is_permission_denied()));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn offline_store_fails_every_call() {
    let store = MemoryRemoteStore::new();
    store.set_offline(true);
    assert!(store.probe("clients").await.unwrap_err().is_transport());
    assert!(store
        .get_one("clients", "doc-a")
        .await
        .unwrap_err()
        .is_transport());
    store.set_offline(false);
    assert!(store.get_one("clients", "doc-a").await.unwrap().is_none());
}
