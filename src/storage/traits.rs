/// Local slot storage for the offline copy of each domain list.
///
/// `LocalStore` is the narrow synchronous I/O trait implemented by concrete
/// backends (in-memory, SQLite). A slot holds a whole record list; every
/// write replaces the slot, so a write either lands completely or not at all.
use crate::error::StorageError;
use crate::types::Record;

/// Synchronous key → record-list store.
///
/// Implementors must be `Send + Sync` so a store can be shared by the
/// coordinators of several domains.
pub trait LocalStore: Send + Sync {
    /// Read the list stored under `key`. A missing slot reads as empty.
    fn read(&self, key: &str) -> Result<Vec<Record>, StorageError>;

    /// Replace the list stored under `key`.
    fn write(&self, key: &str, records: &[Record]) -> Result<(), StorageError>;

    /// Remove the slot entirely.
    fn clear(&self, key: &str) -> Result<(), StorageError>;
}

/// Decode a slot's JSON text, mapping parse failures to `Corruption`.
pub(crate) fn decode_slot(key: &str, raw: &str) -> Result<Vec<Record>, StorageError> {
    serde_json::from_str(raw).map_err(|source| StorageError::Corruption {
        key: key.to_string(),
        source,
    })
}

pub(crate) fn encode_slot(key: &str, records: &[Record]) -> Result<String, StorageError> {
    serde_json::to_string(records).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })
}
