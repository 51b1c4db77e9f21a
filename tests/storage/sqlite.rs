//! SqliteLocalStore: slot persistence on disk and in memory.

use serde_json::json;

use bizdash_sync::error::StorageError;
use bizdash_sync::storage::{LocalStore, SqliteLocalStore};
use bizdash_sync::types::Record;

// ============================================================================
// Test helpers
// ============================================================================

fn make_store() -> SqliteLocalStore {
    SqliteLocalStore::open_in_memory().expect("open in-memory DB")
}

fn make_record(id: &str, owner: Option<&str>) -> Record {
    let mut value = json!({ "id": id, "label": format!("label-{id}") });
    if let Some(owner) = owner {
        value["ownerId"] = json!(owner);
    }
    serde_json::from_value(value).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn read_of_missing_slot_is_empty() {
    let store = make_store();
    assert!(store.read("clients").unwrap().is_empty());
}

#[test]
fn write_then_read_preserves_order_and_owner() {
    let store = make_store();
    let records = vec![
        make_record("tmp-1", None),
        make_record("doc-2", Some("u1")),
        make_record("tmp-3", None),
    ];
    store.write("clients", &records).unwrap();
    assert_eq!(store.read("clients").unwrap(), records);
}

#[test]
fn write_overwrites_existing_slot() {
    let store = make_store();
    store.write("clients", &[make_record("a", None)]).unwrap();
    store.write("clients", &[make_record("b", None)]).unwrap();
    let read = store.read("clients").unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id, "b");
}

#[test]
fn clear_deletes_only_that_slot() {
    let store = make_store();
    store.write("clients", &[make_record("a", None)]).unwrap();
    store
        .write("clients::outbox", &[make_record("tmp-9", None)])
        .unwrap();
    store.clear("clients").unwrap();
    assert_eq!(store.keys().unwrap(), vec!["clients::outbox".to_string()]);
    // Clearing an absent slot is fine.
    store.clear("clients").unwrap();
}

#[test]
fn slots_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slots.db");
    let path = path.to_str().unwrap();

    {
        let store = SqliteLocalStore::open(path).unwrap();
        store
            .write("financeEntries", &[make_record("tmp-1", None)])
            .unwrap();
    }

    let store = SqliteLocalStore::open(path).unwrap();
    let read = store.read("financeEntries").unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id, "tmp-1");
}

#[test]
fn malformed_row_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("slots.db");
    let path = path.to_str().unwrap();
    SqliteLocalStore::open(path).unwrap();

    let conn = rusqlite::Connection::open(path).unwrap();
    conn.execute(
        "INSERT INTO slots (key, value, updated_at) VALUES ('clients', 'not json', '')",
        [],
    )
    .unwrap();
    drop(conn);

    let store = SqliteLocalStore::open(path).unwrap();
    assert!(matches!(
        store.read("clients"),
        Err(StorageError::Corruption { .. })
    ));
}
