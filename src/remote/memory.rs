//! In-process document store implementing [`RemoteStore`].
//!
//! Documents live in per-collection ordered maps with sequential ids
//! (`doc-000001`, ...). Live queries are fanned out over unbounded channels:
//! each mutation re-evaluates every subscriber on the touched collection and
//! sends it the full filtered result set.
//!
//! Faults can be injected per operation ([`fail_next`](MemoryRemoteStore::fail_next))
//! or globally ([`set_offline`](MemoryRemoteStore::set_offline)), and every
//! call is recorded for assertions.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::RemoteError;
use crate::types::{FieldMap, Record};

use super::types::{CreateOp, QueryFilter, RemoteStore, SnapshotSender, SnapshotStream};

// ============================================================================
// Call log
// ============================================================================

/// Operation kinds, used for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Probe,
    Query,
    Subscribe,
    GetOne,
    Create,
    Update,
    Delete,
    BatchCommit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub op: RemoteOp,
    pub collection: String,
    /// Target document id, for single-document ops.
    pub id: Option<String>,
    /// Number of documents written (create / batch).
    pub count: usize,
}

// ============================================================================
// MemoryRemoteStore
// ============================================================================

struct Subscriber {
    id: u64,
    collection: String,
    filter: QueryFilter,
    sender: SnapshotSender,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Record>>,
    next_doc: u64,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
    offline: bool,
    faults: HashMap<RemoteOp, VecDeque<RemoteError>>,
    calls: Vec<RemoteCall>,
}

impl Inner {
    fn next_doc_id(&mut self) -> String {
        self.next_doc += 1;
        format!("doc-{:06}", self.next_doc)
    }

    /// Record the call, then return any injected failure for it.
    fn enter(
        &mut self,
        op: RemoteOp,
        collection: &str,
        id: Option<&str>,
        count: usize,
    ) -> Result<(), RemoteError> {
        self.calls.push(RemoteCall {
            op,
            collection: collection.to_string(),
            id: id.map(str::to_string),
            count,
        });
        if let Some(err) = self.faults.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        if self.offline {
            return Err(RemoteError::transport("remote store offline"));
        }
        Ok(())
    }

    fn snapshot(&self, collection: &str, filter: &QueryFilter) -> Vec<Record> {
        self.collections
            .get(collection)
            .map(|docs| docs.values().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default()
    }

    /// Push the current result set to every live query on `collection`,
    /// dropping subscribers whose stream has gone away.
    fn notify(&mut self, collection: &str) {
        let mut closed = Vec::new();
        for sub in self.subscribers.iter().filter(|s| s.collection == collection) {
            let snapshot = self.snapshot(collection, &sub.filter);
            if sub.sender.send(Ok(snapshot)).is_err() {
                closed.push(sub.id);
            }
        }
        if !closed.is_empty() {
            self.subscribers.retain(|s| !closed.contains(&s.id));
        }
    }
}

/// Cloneable handle; clones share the same documents and subscribers.
#[derive(Clone, Default)]
pub struct MemoryRemoteStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Seeding and inspection
    // -----------------------------------------------------------------------

    /// Insert (or replace) a document with an explicit id, bypassing faults.
    pub fn insert(&self, collection: &str, record: Record) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(record.id.clone(), record);
        inner.notify(collection);
    }

    pub fn document(&self, collection: &str, id: &str) -> Option<Record> {
        self.inner
            .lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned())
    }

    /// Every document in `collection`, in id order.
    pub fn documents(&self, collection: &str) -> Vec<Record> {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.inner.lock().calls.iter().filter(|c| c.op == op).count()
    }

    /// Number of calls that would reach the network for a write or read of
    /// a single document.
    pub fn document_call_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c.op,
                    RemoteOp::GetOne | RemoteOp::Create | RemoteOp::Update | RemoteOp::Delete
                )
            })
            .count()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    // -----------------------------------------------------------------------
    // Fault injection
    // -----------------------------------------------------------------------

    /// Fail the next call of `op` with `err`. Queued faults are consumed in
    /// order, one per call.
    pub fn fail_next(&self, op: RemoteOp, err: RemoteError) {
        self.inner.lock().faults.entry(op).or_default().push_back(err);
    }

    /// While offline every call fails with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Deliver `err` to every live query on `collection` and drop them, the
    /// way a listener is torn down after a server-side error.
    pub fn break_subscriptions(&self, collection: &str, err: RemoteError) {
        let mut inner = self.inner.lock();
        for sub in inner.subscribers.iter().filter(|s| s.collection == collection) {
            let _ = sub.sender.send(Err(err.clone()));
        }
        inner.subscribers.retain(|s| s.collection != collection);
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn probe(&self, collection: &str) -> Result<(), RemoteError> {
        self.inner.lock().enter(RemoteOp::Probe, collection, None, 0)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &QueryFilter,
    ) -> Result<Vec<Record>, RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::Query, collection, None, 0)?;
        Ok(inner.snapshot(collection, filter))
    }

    async fn subscribe(
        &self,
        collection: &str,
        filter: &QueryFilter,
    ) -> Result<SnapshotStream, RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::Subscribe, collection, None, 0)?;

        let (sender, stream) = SnapshotStream::channel();
        let initial = inner.snapshot(collection, filter);
        // The receiver is alive in `stream`, so this cannot fail.
        let _ = sender.send(Ok(initial));

        inner.next_subscriber += 1;
        let id = inner.next_subscriber;
        inner.subscribers.push(Subscriber {
            id,
            collection: collection.to_string(),
            filter: filter.clone(),
            sender,
        });

        let weak = Arc::downgrade(&self.inner);
        Ok(stream.on_cancel(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().subscribers.retain(|s| s.id != id);
            }
        }))
    }

    async fn get_one(&self, collection: &str, id: &str) -> Result<Option<Record>, RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::GetOne, collection, Some(id), 0)?;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn create(&self, collection: &str, op: CreateOp) -> Result<String, RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::Create, collection, None, 1)?;
        let id = inner.next_doc_id();
        let record = op.into_record(id.clone());
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), record);
        inner.notify(collection);
        Ok(id)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        partial: FieldMap,
    ) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::Update, collection, Some(id), 1)?;
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| RemoteError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        doc.apply_patch(&partial);
        inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::Delete, collection, Some(id), 1)?;
        let removed = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some();
        if removed {
            inner.notify(collection);
        }
        Ok(())
    }

    async fn batch_commit(
        &self,
        collection: &str,
        ops: Vec<CreateOp>,
    ) -> Result<Vec<String>, RemoteError> {
        let mut inner = self.inner.lock();
        inner.enter(RemoteOp::BatchCommit, collection, None, ops.len())?;
        // Everything below is infallible, so the batch lands whole.
        let mut ids = Vec::with_capacity(ops.len());
        for op in ops {
            let id = inner.next_doc_id();
            let record = op.into_record(id.clone());
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), record);
            ids.push(id);
        }
        inner.notify(collection);
        Ok(ids)
    }
}
