//! Id classification, write routing, the owner check, and field diffing.
//!
//! Everything here is pure; the coordinator calls these before touching
//! either store.

use serde_json::Value;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::types::{FieldMap, Record, RESERVED_KEYS, UPDATED_AT};

// ============================================================================
// Id classes
// ============================================================================

/// Lifecycle class of a record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdClass {
    /// Generated locally; never present in the remote store.
    Temporary,
    /// Assigned by the remote store.
    Remote,
}

/// Generates and recognises temporary ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdScheme {
    prefix: String,
    legacy: Vec<String>,
}

impl Default for IdScheme {
    fn default() -> Self {
        Self::new("tmp-", vec!["local-".to_string()])
    }
}

impl IdScheme {
    pub fn new(prefix: impl Into<String>, legacy: Vec<String>) -> Self {
        Self {
            prefix: prefix.into(),
            legacy,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A fresh temporary id: `<prefix><uuid v4>`.
    pub fn generate(&self) -> String {
        format!("{}{}", self.prefix, Uuid::new_v4())
    }

    pub fn classify(&self, id: &str) -> IdClass {
        let temporary = id.starts_with(self.prefix.as_str())
            || self.legacy.iter().any(|p| id.starts_with(p.as_str()));
        if temporary {
            IdClass::Temporary
        } else {
            IdClass::Remote
        }
    }

    pub fn is_temporary(&self, id: &str) -> bool {
        self.classify(id) == IdClass::Temporary
    }
}

// ============================================================================
// Routing
// ============================================================================

/// Store an update or delete must target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Local,
    Remote,
}

/// Temporary ids always stay local; remote ids go remote only while a live
/// connection exists.
pub fn route(class: IdClass, connected: bool) -> Route {
    match (class, connected) {
        (IdClass::Remote, true) => Route::Remote,
        _ => Route::Local,
    }
}

// ============================================================================
// Ownership
// ============================================================================

/// Fail unless `record` is owned by `principal`. A record without an owner
/// fails as well.
pub fn check_owner(collection: &str, record: &Record, principal: &str) -> Result<()> {
    if record.owner_id.as_deref() == Some(principal) {
        return Ok(());
    }
    Err(SyncError::PermissionViolation {
        collection: collection.to_string(),
        id: record.id.clone(),
        owner: record.owner_id.clone(),
        principal: principal.to_string(),
    })
}

// ============================================================================
// Diff
// ============================================================================

/// The subset of `patch` whose values differ from `current`. A field missing
/// from `current` compares as `null`. Reserved keys and `updatedAt` are never
/// part of the result.
pub fn changed_fields(current: &Record, patch: &FieldMap) -> FieldMap {
    let mut changes = FieldMap::new();
    for (key, new_value) in patch {
        if RESERVED_KEYS.contains(&key.as_str()) || key == UPDATED_AT {
            continue;
        }
        let old_value = current.fields.get(key).unwrap_or(&Value::Null);
        if old_value != new_value {
            changes.insert(key.clone(), new_value.clone());
        }
    }
    changes
}
