//! CoordinatorEvent: what listeners hear after every coordinator change.

use crate::error::{ErrorKind, SyncError};
use crate::sync::types::ConnectionState;

/// Where the current working list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSource {
    /// Local slot (offline or degraded mode).
    Local,
    /// A live-query snapshot.
    Snapshot,
    /// A one-shot remote read.
    Refresh,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// The working list was replaced or mutated.
    ListChanged {
        domain: String,
        len: usize,
        source: ListSource,
    },
    /// The outbox of deferred creates changed.
    OutboxChanged { domain: String, len: usize },
    StateChanged {
        domain: String,
        state: ConnectionState,
    },
    /// Local records were written to the remote store on sign-in.
    Migrated { domain: String, count: usize },
    /// A remote create failed and the record was kept locally instead.
    Deferred { domain: String, id: String },
    /// A failure nobody awaited (background snapshot, identity change).
    Error {
        domain: String,
        kind: ErrorKind,
        message: String,
    },
}

impl CoordinatorEvent {
    pub fn error(domain: &str, err: &SyncError) -> Self {
        Self::Error {
            domain: domain.to_string(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn domain(&self) -> &str {
        match self {
            Self::ListChanged { domain, .. }
            | Self::OutboxChanged { domain, .. }
            | Self::StateChanged { domain, .. }
            | Self::Migrated { domain, .. }
            | Self::Deferred { domain, .. }
            | Self::Error { domain, .. } => domain,
        }
    }
}
