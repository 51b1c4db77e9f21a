//! Remote document store interface and an in-process implementation.

pub mod memory;
pub mod types;

pub use memory::{MemoryRemoteStore, RemoteCall, RemoteOp};
pub use types::{
    CreateOp, QueryFilter, RemoteStore, SnapshotEvent, SnapshotSender, SnapshotStream, Unsubscribe,
};
