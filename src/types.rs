use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Domain fields of a record, keyed by field name.
pub type FieldMap = Map<String, Value>;

// ============================================================================
// Well-known field names
// ============================================================================

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";
/// Provenance flag: `true` on remote records that were created offline and
/// migrated on sign-in.
pub const SYNCED_FROM_LOCAL: &str = "syncedFromLocal";
/// Tag on locally captured records whose remote create failed.
pub const PENDING_SYNC: &str = "pendingSync";

/// Keys owned by [`Record`] itself; never accepted as domain fields.
pub(crate) const RESERVED_KEYS: [&str; 2] = ["id", "ownerId"];

// ============================================================================
// Record
// ============================================================================

/// One entry of a domain list, as kept in the local slot and the remote
/// collection.
///
/// Serializes as a single flat JSON object: `{"id": .., "ownerId": .., ...fields}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(rename = "ownerId", default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            id: id.into(),
            owner_id: None,
            fields: without_reserved(fields),
        }
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner_id = Some(owner.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether the record was captured locally after a failed remote create.
    pub fn is_pending_sync(&self) -> bool {
        self.fields
            .get(PENDING_SYNC)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Overwrite fields from `patch`, leaving the others untouched.
    pub fn apply_patch(&mut self, patch: &FieldMap) {
        for (key, value) in patch {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            self.fields.insert(key.clone(), value.clone());
        }
    }
}

/// Drop `id` / `ownerId` from a caller-supplied field map.
pub(crate) fn without_reserved(mut fields: FieldMap) -> FieldMap {
    for key in RESERVED_KEYS {
        fields.remove(key);
    }
    fields
}

/// Current time as an RFC 3339 string.
pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ============================================================================
// Discriminator
// ============================================================================

/// Field/value pair that splits one remote collection between several
/// domains (e.g. `itemType = "payment"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discriminator {
    pub field: String,
    pub value: Value,
}

impl Discriminator {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.fields.get(&self.field) == Some(&self.value)
    }

    pub fn stamp(&self, fields: &mut FieldMap) {
        fields.insert(self.field.clone(), self.value.clone());
    }
}
