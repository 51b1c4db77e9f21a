//! Sync-specific types: connection state, identity events, operation
//! outcomes, toggle specs, and coordinator options.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RemoteError;
use crate::types::{FieldMap, Record};

// ============================================================================
// Connection state
// ============================================================================

/// Why a signed-in coordinator is running from the local slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    /// The connectivity probe exhausted its attempts.
    Unreachable,
    /// The sign-in migration batch was rejected.
    MigrationFailed,
    /// Opening the live query failed.
    AttachFailed,
    /// The live query was closed with a permission error.
    SubscriptionDenied,
    /// The live query was closed with a transport error.
    SubscriptionLost,
}

impl DegradedReason {
    /// Whether a later reconnect attempt can plausibly succeed.
    pub fn is_retryable(self) -> bool {
        !matches!(self, Self::SubscriptionDenied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No principal; the local slot is authoritative.
    #[default]
    Disconnected,
    /// Principal signed in and a live query is attached.
    Connected { principal: String },
    /// Principal signed in but the remote store is not usable; the local slot
    /// stays authoritative until a reconnect succeeds.
    Degraded {
        principal: String,
        reason: DegradedReason,
    },
}

impl ConnectionState {
    pub fn principal(&self) -> Option<&str> {
        match self {
            Self::Disconnected => None,
            Self::Connected { principal } | Self::Degraded { principal, .. } => Some(principal),
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Sign-in state changes emitted by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    SignedIn(String),
    SignedOut,
}

// ============================================================================
// Outcomes
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    /// Written to the remote store; the live query will echo it back.
    Remote { id: String },
    /// Written to the local slot with a temporary id.
    Local { id: String },
    /// The remote write failed; kept in the outbox for the next migration.
    ///
    /// Outbox records are not part of the working list while a principal is
    /// signed in, since that list mirrors the remote store. Read them with
    /// `SyncCoordinator::outbox`; sign-out merges them into the local list
    /// and the next successful connect migrates them.
    Deferred { id: String, error: RemoteError },
}

impl CreateOutcome {
    pub fn id(&self) -> &str {
        match self {
            Self::Remote { id } | Self::Local { id } | Self::Deferred { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Local,
    /// Remote partial write of the listed fields (plus `updatedAt`).
    Remote { changed: Vec<String> },
    /// Every patched field already held the requested value; nothing written.
    Unchanged,
    /// The remote document no longer exists; any local mirror entry was dropped.
    Vanished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Local,
    Remote,
    /// The remote document was already gone.
    AlreadyGone,
}

/// Result of a successful sign-in or reconnect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignInReport {
    /// Local records written to the remote store.
    pub migrated: usize,
    /// Local records left out of migration because they already carry a
    /// remote id.
    pub skipped: usize,
    /// Probe attempts used.
    pub probe_attempts: u32,
}

/// What happened to a snapshot delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// The snapshot replaced the working list.
    Applied { len: usize },
    /// Produced by a subscription that is no longer attached; ignored.
    Stale,
    /// The live query failed and was detached.
    Lost {
        error: RemoteError,
        reason: DegradedReason,
    },
}

// ============================================================================
// ToggleSpec
// ============================================================================

/// Label field kept in step with a toggled flag.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleLabel {
    pub field: String,
    pub on: Value,
    pub off: Value,
}

/// Flip a boolean field, optionally rewriting a dependent label field in the
/// same write.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleSpec {
    pub field: String,
    pub label: Option<ToggleLabel>,
}

impl ToggleSpec {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            label: None,
        }
    }

    pub fn with_label(
        mut self,
        field: impl Into<String>,
        on: impl Into<Value>,
        off: impl Into<Value>,
    ) -> Self {
        self.label = Some(ToggleLabel {
            field: field.into(),
            on: on.into(),
            off: off.into(),
        });
        self
    }

    /// `completed` flag with a `status` of `"completed"` / `"pending"`.
    pub fn completion() -> Self {
        Self::new("completed").with_label("status", "completed", "pending")
    }

    /// The patch that flips `record`. A missing or non-boolean flag counts as
    /// `false`.
    pub fn patch_for(&self, record: &Record) -> FieldMap {
        let next = !record
            .get(&self.field)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let mut patch = FieldMap::new();
        patch.insert(self.field.clone(), Value::Bool(next));
        if let Some(label) = &self.label {
            let value = if next { &label.on } else { &label.off };
            patch.insert(label.field.clone(), value.clone());
        }
        patch
    }
}

// ============================================================================
// CoordinatorOptions
// ============================================================================

/// Configuration for `SyncCoordinator`. Every knob is optional; defaults are
/// listed per field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CoordinatorOptions {
    /// Prefix of locally generated ids (default: `"tmp-"`)
    pub temp_id_prefix: Option<String>,
    /// Other prefixes still recognised as temporary (default: `["local-"]`)
    pub legacy_temp_prefixes: Option<Vec<String>>,
    /// Connectivity probe attempts on sign-in (default: 3, minimum 1)
    pub probe_attempts: Option<u32>,
    /// Delay between probe attempts in ms (default: 1000)
    pub probe_delay_ms: Option<u64>,
    /// Reconnect attempts after a live query is lost (default: 5, 0 disables)
    pub reconnect_attempts: Option<u32>,
    /// Delay before each reconnect attempt in ms (default: 3000)
    pub reconnect_delay_ms: Option<u64>,
    /// Keep a create locally when the remote write fails in transit
    /// (default: true)
    pub degrade_on_create_failure: Option<bool>,
    /// Capacity of the driver's command queue (default: 32)
    pub command_buffer: Option<usize>,
}

impl CoordinatorOptions {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn temp_id_prefix(&self) -> &str {
        self.temp_id_prefix.as_deref().unwrap_or("tmp-")
    }

    pub fn legacy_temp_prefixes(&self) -> Vec<String> {
        self.legacy_temp_prefixes
            .clone()
            .unwrap_or_else(|| vec!["local-".to_string()])
    }

    pub fn probe_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.probe_attempts.unwrap_or(3).max(1),
            delay: Duration::from_millis(self.probe_delay_ms.unwrap_or(1000)),
        }
    }

    pub fn reconnect_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.reconnect_attempts.unwrap_or(5),
            delay: Duration::from_millis(self.reconnect_delay_ms.unwrap_or(3000)),
        }
    }

    pub fn degrade_on_create_failure(&self) -> bool {
        self.degrade_on_create_failure.unwrap_or(true)
    }

    pub fn command_buffer(&self) -> usize {
        self.command_buffer.unwrap_or(32).max(1)
    }
}

/// Fixed-delay retry budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}
