//! CoordinatorDriver: runs one `SyncCoordinator` on a single task.
//!
//! Identity events, presentation commands, live-query deliveries, and the
//! reconnect timer are multiplexed by one `tokio::select!` loop, so every
//! mutation of the coordinator happens in order on one execution context.
//! Presentation code talks to the loop through a cloneable
//! [`CoordinatorHandle`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::{Result, SyncError};
use crate::reactive::{CoordinatorEvent, EventEmitter};
use crate::types::{FieldMap, Record};

use super::coordinator::SyncCoordinator;
use super::subscription::SnapshotDelivery;
use super::types::{
    ConnectionState, CreateOutcome, DeleteOutcome, DeliveryOutcome, IdentityEvent, SignInReport,
    ToggleSpec, UpdateOutcome,
};

type Reply<T> = oneshot::Sender<Result<T>>;

/// Requests from a [`CoordinatorHandle`] to the driver loop.
enum Command {
    Create {
        fields: FieldMap,
        reply: Reply<CreateOutcome>,
    },
    Update {
        id: String,
        patch: FieldMap,
        reply: Reply<UpdateOutcome>,
    },
    Delete {
        id: String,
        reply: Reply<DeleteOutcome>,
    },
    Toggle {
        id: String,
        spec: ToggleSpec,
        reply: Reply<UpdateOutcome>,
    },
    Refresh {
        reply: Reply<usize>,
    },
    Reconnect {
        reply: Reply<SignInReport>,
    },
    Records {
        reply: oneshot::Sender<Vec<Record>>,
    },
    Outbox {
        reply: Reply<Vec<Record>>,
    },
    State {
        reply: oneshot::Sender<ConnectionState>,
    },
}

// ============================================================================
// CoordinatorHandle
// ============================================================================

/// Cloneable front end of a running driver. Every method fails with
/// `SyncError::Disposed` once the driver has stopped.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::Sender<Command>,
    events: Arc<EventEmitter<CoordinatorEvent>>,
}

impl CoordinatorHandle {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SyncError::Disposed)?;
        response.await.map_err(|_| SyncError::Disposed)
    }

    pub async fn create(&self, fields: FieldMap) -> Result<CreateOutcome> {
        self.request(|reply| Command::Create { fields, reply }).await?
    }

    pub async fn update(&self, id: impl Into<String>, patch: FieldMap) -> Result<UpdateOutcome> {
        let id = id.into();
        self.request(|reply| Command::Update { id, patch, reply })
            .await?
    }

    pub async fn delete(&self, id: impl Into<String>) -> Result<DeleteOutcome> {
        let id = id.into();
        self.request(|reply| Command::Delete { id, reply }).await?
    }

    pub async fn toggle(&self, id: impl Into<String>, spec: ToggleSpec) -> Result<UpdateOutcome> {
        let id = id.into();
        self.request(|reply| Command::Toggle { id, spec, reply })
            .await?
    }

    pub async fn refresh(&self) -> Result<usize> {
        self.request(|reply| Command::Refresh { reply }).await?
    }

    pub async fn reconnect(&self) -> Result<SignInReport> {
        self.request(|reply| Command::Reconnect { reply }).await?
    }

    /// Copy of the current working list.
    pub async fn records(&self) -> Result<Vec<Record>> {
        self.request(|reply| Command::Records { reply }).await
    }

    pub async fn outbox(&self) -> Result<Vec<Record>> {
        self.request(|reply| Command::Outbox { reply }).await?
    }

    pub async fn state(&self) -> Result<ConnectionState> {
        self.request(|reply| Command::State { reply }).await
    }

    /// The coordinator's listener registry.
    pub fn events(&self) -> Arc<EventEmitter<CoordinatorEvent>> {
        Arc::clone(&self.events)
    }
}

// ============================================================================
// CoordinatorDriver
// ============================================================================

/// Pending reconnect after a lost live query.
#[derive(Debug, Clone, Copy)]
struct ReconnectSchedule {
    at: Instant,
    remaining: u32,
}

pub struct CoordinatorDriver {
    coordinator: SyncCoordinator,
    commands: mpsc::Receiver<Command>,
    identity: mpsc::UnboundedReceiver<IdentityEvent>,
    reconnect: Option<ReconnectSchedule>,
}

impl CoordinatorDriver {
    pub fn new(
        coordinator: SyncCoordinator,
        identity: mpsc::UnboundedReceiver<IdentityEvent>,
    ) -> (Self, CoordinatorHandle) {
        let (tx, rx) = mpsc::channel(coordinator.options().command_buffer());
        let handle = CoordinatorHandle {
            commands: tx,
            events: coordinator.events(),
        };
        let driver = Self {
            coordinator,
            commands: rx,
            identity,
            reconnect: None,
        };
        (driver, handle)
    }

    /// Run until every handle is dropped, then hand the coordinator back.
    ///
    /// Queued deliveries are applied before identity events, and identity
    /// events before commands.
    pub async fn run(mut self) -> SyncCoordinator {
        let mut identity_open = true;
        info!(domain = %self.coordinator.domain(), "Coordinator driver started");

        loop {
            let attached = self.coordinator.is_attached();
            let reconnect_at = self.reconnect.map(|r| r.at);

            tokio::select! {
                biased;

                Some(delivery) = self.coordinator.next_delivery(), if attached => {
                    self.on_delivery(delivery);
                }

                event = self.identity.recv(), if identity_open => match event {
                    Some(event) => self.on_identity(event).await,
                    None => {
                        debug!(domain = %self.coordinator.domain(), "Identity provider closed");
                        identity_open = false;
                    }
                },

                command = self.commands.recv() => match command {
                    Some(command) => self.on_command(command).await,
                    None => break,
                },

                _ = sleep_until(reconnect_at.unwrap_or_else(Instant::now)), if reconnect_at.is_some() => {
                    self.on_reconnect_timer().await;
                }
            }
        }

        info!(domain = %self.coordinator.domain(), "Coordinator driver stopped");
        self.coordinator
    }

    fn on_delivery(&mut self, delivery: SnapshotDelivery) {
        match self.coordinator.apply_delivery(delivery) {
            Ok(DeliveryOutcome::Lost { reason, .. }) if reason.is_retryable() => {
                self.schedule_reconnect();
            }
            Ok(_) => {}
            Err(e) => {
                warn!(domain = %self.coordinator.domain(), error = %e, "Snapshot could not be mirrored");
                self.coordinator.report(&e);
            }
        }
    }

    async fn on_identity(&mut self, event: IdentityEvent) {
        self.reconnect = None;
        // Failures are reported to listeners by the coordinator.
        let _ = self.coordinator.handle_identity(event).await;
    }

    async fn on_command(&mut self, command: Command) {
        let coordinator = &mut self.coordinator;
        match command {
            Command::Create { fields, reply } => {
                let _ = reply.send(coordinator.create(fields).await);
            }
            Command::Update { id, patch, reply } => {
                let _ = reply.send(coordinator.update(&id, patch).await);
            }
            Command::Delete { id, reply } => {
                let _ = reply.send(coordinator.delete(&id).await);
            }
            Command::Toggle { id, spec, reply } => {
                let _ = reply.send(coordinator.toggle(&id, &spec).await);
            }
            Command::Refresh { reply } => {
                let _ = reply.send(coordinator.refresh().await);
            }
            Command::Reconnect { reply } => {
                let _ = reply.send(coordinator.reconnect().await);
            }
            Command::Records { reply } => {
                let _ = reply.send(coordinator.records().to_vec());
            }
            Command::Outbox { reply } => {
                let _ = reply.send(coordinator.outbox());
            }
            Command::State { reply } => {
                let _ = reply.send(coordinator.state().clone());
            }
        }
        if self.coordinator.state().is_connected() {
            self.reconnect = None;
        }
    }

    fn schedule_reconnect(&mut self) {
        let policy = self.coordinator.options().reconnect_policy();
        if policy.attempts == 0 {
            return;
        }
        debug!(
            domain = %self.coordinator.domain(),
            attempts = policy.attempts,
            delay_ms = policy.delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        self.reconnect = Some(ReconnectSchedule {
            at: Instant::now() + policy.delay,
            remaining: policy.attempts,
        });
    }

    async fn on_reconnect_timer(&mut self) {
        let Some(schedule) = self.reconnect.take() else {
            return;
        };
        if !matches!(self.coordinator.state(), ConnectionState::Degraded { .. }) {
            return;
        }

        match self.coordinator.reconnect().await {
            Ok(report) => {
                info!(
                    domain = %self.coordinator.domain(),
                    migrated = report.migrated,
                    "Reconnected"
                );
            }
            Err(e) => {
                let remaining = schedule.remaining.saturating_sub(1);
                if remaining > 0 {
                    let delay = self.coordinator.options().reconnect_policy().delay;
                    debug!(domain = %self.coordinator.domain(), remaining, error = %e, "Reconnect failed");
                    self.reconnect = Some(ReconnectSchedule {
                        at: Instant::now() + delay,
                        remaining,
                    });
                } else {
                    warn!(domain = %self.coordinator.domain(), error = %e, "Giving up on reconnect");
                    self.coordinator.report(&e);
                }
            }
        }
    }
}
