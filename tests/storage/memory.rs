//! MemoryLocalStore slot semantics.

use serde_json::json;

use bizdash_sync::error::StorageError;
use bizdash_sync::storage::{LocalStore, MemoryLocalStore};
use bizdash_sync::types::Record;

fn record(id: &str) -> Record {
    serde_json::from_value(json!({ "id": id, "label": id })).unwrap()
}

#[test]
fn missing_slot_reads_empty() {
    let store = MemoryLocalStore::new();
    assert!(store.read("clients").unwrap().is_empty());
    assert!(!store.contains("clients"));
}

#[test]
fn write_replaces_whole_slot() {
    let store = MemoryLocalStore::new();
    store.write("clients", &[record("a"), record("b")]).unwrap();
    store.write("clients", &[record("c")]).unwrap();
    let ids: Vec<String> = store
        .read("clients")
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, vec!["c".to_string()]);
}

#[test]
fn slots_are_stored_as_json_arrays() {
    let store = MemoryLocalStore::new();
    store.write("scripts", &[record("a")]).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&store.raw("scripts").unwrap()).unwrap();
    assert_eq!(raw, json!([{"id": "a", "label": "a"}]));
}

#[test]
fn clear_removes_slot() {
    let store = MemoryLocalStore::new();
    store.write("clients", &[record("a")]).unwrap();
    store.clear("clients").unwrap();
    assert!(!store.contains("clients"));
    assert!(store.read("clients").unwrap().is_empty());
}

#[test]
fn malformed_slot_is_corruption() {
    let store = MemoryLocalStore::new();
    store.set_raw("clients", "{\"id\": 1");
    let err = store.read("clients").unwrap_err();
    assert!(matches!(err, StorageError::Corruption { ref key, .. } if key == "clients"));
}

#[test]
fn read_only_store_rejects_writes_but_serves_reads() {
    let store = MemoryLocalStore::new();
    store.write("clients", &[record("a")]).unwrap();
    store.set_read_only(Some("quota exceeded"));

    assert!(matches!(
        store.write("clients", &[]),
        Err(StorageError::Unavailable(_))
    ));
    assert!(store.clear("clients").is_err());
    assert_eq!(store.read("clients").unwrap().len(), 1);

    store.set_read_only(None);
    store.clear("clients").unwrap();
    assert_eq!(store.keys(), Vec::<String>::new());
}
