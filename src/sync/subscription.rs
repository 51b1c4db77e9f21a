//! The coordinator's single live-query slot.
//!
//! Every attach and every detach bumps the generation. Deliveries carry the
//! generation they were read under, so a delivery that outlives its stream
//! can be recognised and dropped.

use crate::error::RemoteError;
use crate::remote::{SnapshotEvent, SnapshotStream};

/// Attach/detach counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One event read from the live query, tagged with its generation.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotDelivery {
    pub generation: Generation,
    pub event: SnapshotEvent,
}

#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    generation: Generation,
    stream: Option<SnapshotStream>,
}

impl SubscriptionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_attached(&self) -> bool {
        self.stream.is_some()
    }

    /// Replace any current stream with `stream`.
    pub fn attach(&mut self, stream: SnapshotStream) -> Generation {
        self.detach();
        self.generation = self.generation.next();
        self.stream = Some(stream);
        self.generation
    }

    /// Cancel the current stream, if any. Returns whether one was attached.
    pub fn detach(&mut self) -> bool {
        match self.stream.take() {
            Some(stream) => {
                stream.cancel();
                self.generation = self.generation.next();
                true
            }
            None => false,
        }
    }

    /// Whether `generation` belongs to the stream attached right now.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.stream.is_some() && generation == self.generation
    }

    /// Wait for the next event of the attached stream. A stream closed by
    /// the transport yields a transport error. `None` when nothing is
    /// attached.
    pub async fn next(&mut self) -> Option<SnapshotDelivery> {
        let generation = self.generation;
        let stream = self.stream.as_mut()?;
        let event = stream.next().await.unwrap_or_else(closed);
        Some(SnapshotDelivery { generation, event })
    }

    /// Like [`next`](Self::next) but only returns an already queued event.
    pub fn try_next(&mut self) -> Option<SnapshotDelivery> {
        let generation = self.generation;
        let event = self.stream.as_mut()?.try_next()?;
        Some(SnapshotDelivery { generation, event })
    }
}

fn closed() -> SnapshotEvent {
    Err(RemoteError::transport("live query closed by transport"))
}
