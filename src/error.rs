use thiserror::Error;

// ---------------------------------------------------------------------------
// RemoteError
// ---------------------------------------------------------------------------

/// Failure reported by a [`RemoteStore`](crate::remote::RemoteStore).
///
/// Every transport maps its native errors onto these three classes; the
/// coordinator decides what to do based on the class alone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Failure of a [`LocalStore`](crate::storage::LocalStore) slot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Local slot \"{key}\" holds malformed data")]
    Corruption {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize records for local slot \"{key}\"")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Local store unavailable: {0}")]
    Unavailable(String),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

// ---------------------------------------------------------------------------
// SyncError — top-level rollup
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    /// The fetched remote record belongs to someone else.
    #[error(
        "Permission violation on {collection}/{id}: owned by {}, not {principal}",
        .owner.as_deref().unwrap_or("<nobody>")
    )]
    PermissionViolation {
        collection: String,
        id: String,
        owner: Option<String>,
        principal: String,
    },

    /// The remote store itself refused the operation.
    #[error("Permission denied by remote store: {0}")]
    PermissionDenied(String),

    #[error("Remote record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Record \"{id}\" does not exist in \"{domain}\"")]
    UnknownRecord { domain: String, id: String },

    #[error("Migration of {count} local record(s) failed")]
    Migration {
        count: usize,
        #[source]
        source: RemoteError,
    },

    #[error("Unable to reach the remote store after {attempts} attempt(s)")]
    Unreachable {
        attempts: u32,
        #[source]
        last: RemoteError,
    },

    #[error("No remote connection is attached")]
    NotConnected,

    #[error("Sync coordinator disposed")]
    Disposed,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::PermissionDenied(message) => Self::PermissionDenied(message),
            RemoteError::NotFound { collection, id } => Self::NotFound { collection, id },
            RemoteError::Transport(message) => Self::Transport(message),
        }
    }
}

/// Coarse classification used when an error is reported to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Permission,
    Transport,
    Storage,
    Unreachable,
    Other,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PermissionViolation { .. } | Self::PermissionDenied(_) => ErrorKind::Permission,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Migration { source, .. } if source.is_permission_denied() => {
                ErrorKind::Permission
            }
            Self::Migration { .. } => ErrorKind::Transport,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Storage(_) => ErrorKind::Storage,
            Self::NotFound { .. } | Self::UnknownRecord { .. } | Self::NotConnected | Self::Disposed => {
                ErrorKind::Other
            }
        }
    }

    /// True for both an owner mismatch and a remote-side denial.
    pub fn is_permission_violation(&self) -> bool {
        self.kind() == ErrorKind::Permission
    }
}

/// Result alias defaulting to `SyncError`.
pub type Result<T, E = SyncError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
