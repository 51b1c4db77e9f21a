//! Listener side of the coordinator.
//!
//! Presentation code registers on the coordinator's
//! [`EventEmitter<CoordinatorEvent>`] and re-renders on each event; the
//! coordinator emits unconditionally after every state change.

pub mod event;
pub mod event_emitter;

pub use event::{CoordinatorEvent, ListSource};
pub use event_emitter::{EventEmitter, ListenerGuard, ListenerId};
