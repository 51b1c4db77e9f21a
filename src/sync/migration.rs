//! Sign-in migration planning.
//!
//! `plan_migration` is pure: it turns the local slot and outbox into the
//! create-ops for one atomic `batch_commit`. Only after that commit succeeds
//! does the coordinator swap the temporary records in the local slots for
//! the committed documents.

use std::collections::HashSet;

use serde_json::Value;

use crate::remote::CreateOp;
use crate::types::{Discriminator, Record, CREATED_AT, PENDING_SYNC, SYNCED_FROM_LOCAL};

use super::guard::IdScheme;

/// Create-ops for one sign-in, plus bookkeeping for logging and events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationPlan {
    /// One op per migrated record, in local-slot order then outbox order.
    pub ops: Vec<CreateOp>,
    /// Temporary id of the record behind each op, in `ops` order.
    pub origins: Vec<String>,
    /// Ids left out because they are already remote-assigned.
    pub skipped: Vec<String>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Build the migration for `principal`.
///
/// Every temporary-id record becomes a create-op without its id, stamped with
/// `ownerId`, `createdAt` (kept if already present), `syncedFromLocal = true`,
/// and the domain discriminator. `pendingSync` is dropped. Records whose id
/// appears twice are migrated once. Remote-id records are mirrors of an
/// earlier snapshot and are skipped.
pub fn plan_migration(
    local: &[Record],
    outbox: &[Record],
    principal: &str,
    ids: &IdScheme,
    discriminator: Option<&Discriminator>,
    now: &str,
) -> MigrationPlan {
    let mut plan = MigrationPlan::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for record in local.iter().chain(outbox) {
        if !seen.insert(record.id.as_str()) {
            continue;
        }
        if !ids.is_temporary(&record.id) {
            plan.skipped.push(record.id.clone());
            continue;
        }

        let mut fields = record.fields.clone();
        fields.remove(PENDING_SYNC);
        fields
            .entry(CREATED_AT)
            .or_insert_with(|| Value::String(now.to_string()));
        fields.insert(SYNCED_FROM_LOCAL.to_string(), Value::Bool(true));
        if let Some(d) = discriminator {
            d.stamp(&mut fields);
        }

        plan.ops.push(CreateOp::new(principal, fields));
        plan.origins.push(record.id.clone());
    }

    plan
}
