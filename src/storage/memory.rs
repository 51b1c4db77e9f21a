//! In-process local store.
//!
//! Slots are kept as serialized JSON text, the same shape a browser's local
//! storage holds, so a corrupted slot surfaces exactly as it would there.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::StorageError;
use crate::types::Record;

use super::traits::{decode_slot, encode_slot, LocalStore};

#[derive(Default)]
pub struct MemoryLocalStore {
    slots: Mutex<HashMap<String, String>>,
    /// When set, every write fails with `Unavailable` (quota exceeded, etc.).
    read_only: Mutex<Option<String>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON text of a slot, if present.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.slots.lock().get(key).cloned()
    }

    /// Store raw text under `key` without validation.
    pub fn set_raw(&self, key: &str, raw: impl Into<String>) {
        self.slots.lock().insert(key.to_string(), raw.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.lock().contains_key(key)
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.slots.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Make subsequent writes and clears fail with `reason`; `None` restores.
    pub fn set_read_only(&self, reason: Option<&str>) {
        *self.read_only.lock() = reason.map(str::to_string);
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        match self.read_only.lock().as_ref() {
            Some(reason) => Err(StorageError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

impl LocalStore for MemoryLocalStore {
    fn read(&self, key: &str) -> Result<Vec<Record>, StorageError> {
        match self.slots.lock().get(key) {
            Some(raw) => decode_slot(key, raw),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, key: &str, records: &[Record]) -> Result<(), StorageError> {
        self.check_writable()?;
        let raw = encode_slot(key, records)?;
        self.slots.lock().insert(key.to_string(), raw);
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<(), StorageError> {
        self.check_writable()?;
        self.slots.lock().remove(key);
        Ok(())
    }
}
