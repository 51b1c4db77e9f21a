//! EventEmitter<T> — typed synchronous pub/sub for coordinator listeners.
//!
//! Listeners are stored as `Arc<dyn Fn(&T)>` and emission works on a
//! snapshot of the list:
//!   - a listener removed during emission is still called in that round;
//!   - a listener added during emission waits for the next emit.
//!
//! The `parking_lot::Mutex` guarding the list is never held while a listener
//! runs, so listeners may register or remove listeners themselves.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Identifies a registered listener for [`EventEmitter::off`].
pub type ListenerId = u64;

/// Closure type for event listeners.
pub type ListenerFn<T> = dyn Fn(&T) + Send + Sync;

type ListenerList<T> = Mutex<Vec<(ListenerId, Arc<ListenerFn<T>>)>>;

pub struct EventEmitter<T> {
    listeners: Arc<ListenerList<T>>,
    next_id: AtomicU64,
}

impl<T> EventEmitter<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `callback`; it stays registered until [`off`](Self::off).
    pub fn on(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(callback)));
        id
    }

    /// Register `callback` for as long as the returned guard lives.
    pub fn scoped(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> ListenerGuard<T> {
        let id = self.on(callback);
        ListenerGuard {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn off(&self, id: ListenerId) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }

    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Arc<ListenerFn<T>>> = {
            let guard = self.listeners.lock();
            guard.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for cb in snapshot {
            cb(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for EventEmitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its listener when dropped.
pub struct ListenerGuard<T> {
    id: ListenerId,
    listeners: Weak<ListenerList<T>>,
}

impl<T> ListenerGuard<T> {
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl<T> Drop for ListenerGuard<T> {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.lock().retain(|(lid, _)| *lid != self.id);
        }
    }
}
