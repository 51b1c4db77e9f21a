//! Remote-store types: the store trait, query filters, create ops, and the
//! cancellable snapshot stream returned by `subscribe`.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::RemoteError;
use crate::types::{Discriminator, FieldMap, Record};

// ============================================================================
// RemoteStore — user-provided document database
// ============================================================================

/// Asynchronous document collection keyed by remote-assigned ids.
///
/// Implementations wrap the real document database (HTTP, WebSocket, an
/// embedded SDK). Every failure must be classified as a [`RemoteError`].
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Cheap reachability check against `collection`. A permission-denied
    /// answer proves the store is reachable.
    async fn probe(&self, collection: &str) -> Result<(), RemoteError>;

    /// One-shot read of every record matching `filter`.
    async fn query(&self, collection: &str, filter: &QueryFilter)
        -> Result<Vec<Record>, RemoteError>;

    /// Open a live query. The first event carries the current result set;
    /// every later change delivers the full result set again.
    async fn subscribe(
        &self,
        collection: &str,
        filter: &QueryFilter,
    ) -> Result<SnapshotStream, RemoteError>;

    async fn get_one(&self, collection: &str, id: &str) -> Result<Option<Record>, RemoteError>;

    /// Create a document and return its assigned id.
    async fn create(&self, collection: &str, op: CreateOp) -> Result<String, RemoteError>;

    /// Merge `partial` into an existing document. Fails with `NotFound` when
    /// the document is absent.
    async fn update(&self, collection: &str, id: &str, partial: FieldMap)
        -> Result<(), RemoteError>;

    /// Delete a document. Deleting an absent document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError>;

    /// Create every op atomically: either all documents exist afterwards or
    /// none do. Returns assigned ids in op order.
    async fn batch_commit(
        &self,
        collection: &str,
        ops: Vec<CreateOp>,
    ) -> Result<Vec<String>, RemoteError>;
}

// ============================================================================
// QueryFilter / CreateOp
// ============================================================================

/// Equality filter: owner, plus an optional discriminator.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryFilter {
    pub owner_id: String,
    pub discriminator: Option<Discriminator>,
}

impl QueryFilter {
    pub fn owner(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            discriminator: None,
        }
    }

    pub fn with_discriminator(mut self, discriminator: Option<Discriminator>) -> Self {
        self.discriminator = discriminator;
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.owner_id.as_deref() == Some(self.owner_id.as_str())
            && self
                .discriminator
                .as_ref()
                .map_or(true, |d| d.matches(record))
    }
}

/// A document to create. The remote store assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOp {
    pub owner_id: String,
    pub fields: FieldMap,
}

impl CreateOp {
    pub fn new(owner_id: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            owner_id: owner_id.into(),
            fields,
        }
    }

    /// The document as stored once `id` has been assigned.
    pub fn into_record(self, id: impl Into<String>) -> Record {
        Record::new(id, self.fields).owned_by(self.owner_id)
    }
}

// ============================================================================
// SnapshotStream
// ============================================================================

/// One delivery from a live query: the full result set, or the error that
/// ended the query.
pub type SnapshotEvent = Result<Vec<Record>, RemoteError>;

/// An owned one-shot closure that tears down the transport-side listener.
pub type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// Sending half handed to transport implementations.
pub type SnapshotSender = mpsc::UnboundedSender<SnapshotEvent>;

/// Receiving end of a live query.
///
/// Dropping the stream (or calling [`cancel`](Self::cancel)) runs the
/// transport's unsubscribe hook exactly once and discards any queued events.
pub struct SnapshotStream {
    receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
    unsubscribe: Option<Unsubscribe>,
}

impl SnapshotStream {
    /// Create a connected sender/stream pair with no unsubscribe hook.
    pub fn channel() -> (SnapshotSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                receiver: rx,
                unsubscribe: None,
            },
        )
    }

    pub fn on_cancel(mut self, unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.unsubscribe = Some(Box::new(unsubscribe));
        self
    }

    /// Wait for the next event. `None` once the transport closed the stream.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.receiver.recv().await
    }

    /// Take an already queued event without waiting.
    pub fn try_next(&mut self) -> Option<SnapshotEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn cancel(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.receiver.close();
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for SnapshotStream {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for SnapshotStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStream")
            .field("cancelled", &self.unsubscribe.is_none())
            .finish()
    }
}
