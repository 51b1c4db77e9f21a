//! SyncCoordinator — one domain list, local-first until a principal signs in.
//!
//! While `Disconnected` (or `Degraded`) the local slot is authoritative and
//! the working list mirrors it after every mutation. On sign-in the
//! coordinator probes the remote store, migrates temporary-id records in one
//! atomic batch, and attaches a live query whose snapshots replace both the
//! working list and the local slot. Sign-out detaches and keeps the last
//! snapshot as the new local baseline.
//!
//! All methods take `&mut self`: callers serialize access, normally through
//! [`CoordinatorDriver`](super::driver::CoordinatorDriver).

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::DomainConfig;
use crate::error::{RemoteError, Result, SyncError};
use crate::reactive::{CoordinatorEvent, EventEmitter, ListSource};
use crate::remote::{CreateOp, QueryFilter, RemoteStore};
use crate::storage::LocalStore;
use crate::types::{
    timestamp_now, without_reserved, FieldMap, Record, CREATED_AT, PENDING_SYNC,
    SYNCED_FROM_LOCAL, UPDATED_AT,
};

use super::guard::{changed_fields, check_owner, route, IdScheme, Route};
use super::migration::plan_migration;
use super::probe::probe_with_retry;
use super::subscription::{Generation, SnapshotDelivery, SubscriptionSlot};
use super::types::{
    ConnectionState, CoordinatorOptions, CreateOutcome, DegradedReason, DeleteOutcome,
    DeliveryOutcome, IdentityEvent, SignInReport, ToggleSpec, UpdateOutcome,
};

/// Which local list a local-route mutation edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// The working list and its local slot.
    Working,
    /// Deferred creates awaiting migration.
    Outbox,
}

/// A committed migration batch whose local slots still hold the temporary
/// records it replaced.
#[derive(Debug, Clone)]
struct Settlement {
    /// Temporary ids the batch migrated.
    origins: HashSet<String>,
    /// The committed documents under their assigned ids.
    records: Vec<Record>,
}

// ============================================================================
// SyncCoordinator
// ============================================================================

pub struct SyncCoordinator {
    config: DomainConfig,
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    ids: IdScheme,
    options: CoordinatorOptions,
    state: ConnectionState,
    records: Vec<Record>,
    subscription: SubscriptionSlot,
    unsettled: Option<Settlement>,
    events: Arc<EventEmitter<CoordinatorEvent>>,
}

impl SyncCoordinator {
    /// Create a disconnected coordinator whose working list is loaded from
    /// the local slot.
    pub fn new(
        config: impl Into<DomainConfig>,
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        options: CoordinatorOptions,
    ) -> Result<Self> {
        let config = config.into();
        let records = local.read(&config.local_key)?;
        let ids = IdScheme::new(options.temp_id_prefix(), options.legacy_temp_prefixes());
        debug!(domain = %config.local_key, count = records.len(), "Loaded local slot");

        Ok(Self {
            config,
            local,
            remote,
            ids,
            options,
            state: ConnectionState::Disconnected,
            records,
            subscription: SubscriptionSlot::new(),
            unsettled: None,
            events: Arc::new(EventEmitter::new()),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Local slot key, used as the domain name in logs and events.
    pub fn domain(&self) -> &str {
        &self.config.local_key
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn ids(&self) -> &IdScheme {
        &self.ids
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn principal(&self) -> Option<&str> {
        self.state.principal()
    }

    /// The working list presentation code renders.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Creates captured locally after a failed remote write. They stay out of
    /// [`records`](Self::records) until sign-out merges them in.
    pub fn outbox(&self) -> Result<Vec<Record>> {
        Ok(self.local.read(&self.config.outbox_key())?)
    }

    pub fn events(&self) -> Arc<EventEmitter<CoordinatorEvent>> {
        Arc::clone(&self.events)
    }

    pub fn generation(&self) -> Generation {
        self.subscription.generation()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_attached()
    }

    // -----------------------------------------------------------------------
    // Identity transitions
    // -----------------------------------------------------------------------

    /// Dispatch an identity event. Failures are also reported to listeners,
    /// since identity changes usually have no awaiting caller.
    pub async fn handle_identity(&mut self, event: IdentityEvent) -> Result<()> {
        let result = match event {
            IdentityEvent::SignedIn(principal) => self.sign_in(&principal).await.map(|_| ()),
            IdentityEvent::SignedOut => self.sign_out(),
        };
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Probe, migrate, attach. Signing in as a different principal signs the
    /// current one out first; signing in again as the connected principal is
    /// a no-op.
    ///
    /// On failure the principal stays signed in and the coordinator moves to
    /// `Degraded` with the local slot untouched unless the migration batch
    /// had already committed.
    pub async fn sign_in(&mut self, principal: &str) -> Result<SignInReport> {
        let current = self.state.principal().map(str::to_string);
        match current {
            Some(current) if current != principal => self.sign_out()?,
            Some(_) if self.state.is_connected() => return Ok(SignInReport::default()),
            _ => {}
        }
        self.connect(principal.to_string()).await
    }

    /// Detach and fall back to the local slot. The last mirrored snapshot
    /// plus any outbox records become the local-only baseline.
    pub fn sign_out(&mut self) -> Result<()> {
        let Some(principal) = self.state.principal().map(str::to_string) else {
            return Ok(());
        };
        self.subscription.detach();
        self.set_state(ConnectionState::Disconnected);
        self.settle()?;

        let outbox_key = self.config.outbox_key();
        let outbox = self.local.read(&outbox_key)?;
        let mut baseline = self.local.read(&self.config.local_key)?;
        if !outbox.is_empty() {
            for record in outbox {
                if !baseline.iter().any(|r| r.id == record.id) {
                    baseline.push(record);
                }
            }
            self.local.write(&self.config.local_key, &baseline)?;
            self.local.clear(&outbox_key)?;
            self.emit_outbox(0);
        }

        info!(domain = %self.config.local_key, %principal, count = baseline.len(), "Signed out");
        self.records = baseline;
        self.emit_list(ListSource::Local);
        Ok(())
    }

    /// Retry the connection for the signed-in principal after a degrade.
    pub async fn reconnect(&mut self) -> Result<SignInReport> {
        let principal = self
            .state
            .principal()
            .map(str::to_string)
            .ok_or(SyncError::NotConnected)?;
        if self.state.is_connected() {
            return Ok(SignInReport::default());
        }
        self.connect(principal).await
    }

    async fn connect(&mut self, principal: String) -> Result<SignInReport> {
        match self.establish(&principal).await {
            Ok(report) => Ok(report),
            Err(e) => {
                let reason = degraded_reason(&e);
                warn!(
                    domain = %self.config.local_key,
                    %principal,
                    ?reason,
                    error = %e,
                    "Remote store unavailable; staying local"
                );
                self.degrade(principal, reason);
                Err(e)
            }
        }
    }

    async fn establish(&mut self, principal: &str) -> Result<SignInReport> {
        let collection = self.config.collection.clone();
        let probe_attempts =
            probe_with_retry(self.remote.as_ref(), &collection, &self.options.probe_policy())
                .await?;

        // A batch committed by an earlier attempt must reach the local slots
        // before anything is planned again.
        self.settle()?;

        // Migration
        let outbox_key = self.config.outbox_key();
        let local = self.local.read(&self.config.local_key)?;
        let outbox = self.local.read(&outbox_key)?;
        let plan = plan_migration(
            &local,
            &outbox,
            principal,
            &self.ids,
            self.config.discriminator.as_ref(),
            &timestamp_now(),
        );
        let migrated = plan.len();
        let skipped = plan.skipped.len();
        if skipped > 0 {
            debug!(domain = %self.config.local_key, skipped, "Skipping already-remote records");
        }
        if !plan.is_empty() {
            let assigned = self
                .remote
                .batch_commit(&collection, plan.ops.clone())
                .await
                .map_err(|source| SyncError::Migration {
                    count: migrated,
                    source,
                })?;
            let records = plan
                .ops
                .into_iter()
                .zip(assigned)
                .map(|(op, id)| op.into_record(id))
                .collect();
            self.unsettled = Some(Settlement {
                origins: plan.origins.into_iter().collect(),
                records,
            });
            info!(domain = %self.config.local_key, %principal, count = migrated, "Migrated local records");
            self.emit(CoordinatorEvent::Migrated {
                domain: self.config.local_key.clone(),
                count: migrated,
            });
            self.settle()?;
            if !outbox.is_empty() {
                self.emit_outbox(0);
            }
        }

        // Attach
        let filter = self.filter_for(principal);
        let stream = self.remote.subscribe(&collection, &filter).await?;
        let generation = self.subscription.attach(stream);
        info!(domain = %self.config.local_key, %principal, %generation, "Live query attached");
        self.set_state(ConnectionState::Connected {
            principal: principal.to_string(),
        });

        Ok(SignInReport {
            migrated,
            skipped,
            probe_attempts,
        })
    }

    /// Detach and serve the local slot while keeping the principal.
    fn degrade(&mut self, principal: String, reason: DegradedReason) {
        self.subscription.detach();
        match self.local_baseline() {
            Ok(records) => self.records = records,
            Err(e) => warn!(domain = %self.config.local_key, error = %e, "Local slot unreadable"),
        }
        self.set_state(ConnectionState::Degraded { principal, reason });
        self.emit_list(ListSource::Local);
    }

    /// Replace the migrated temporary records in the local slots with the
    /// committed documents. Until this succeeds the origins stay excluded
    /// from every later migration.
    fn settle(&mut self) -> Result<()> {
        let Some(settlement) = &self.unsettled else {
            return Ok(());
        };
        let baseline = self.local_baseline()?;
        self.local.write(&self.config.local_key, &baseline)?;

        let outbox_key = self.config.outbox_key();
        let remaining: Vec<Record> = self
            .local
            .read(&outbox_key)?
            .into_iter()
            .filter(|r| !settlement.origins.contains(&r.id))
            .collect();
        if remaining.is_empty() {
            self.local.clear(&outbox_key)?;
        } else {
            self.local.write(&outbox_key, &remaining)?;
        }

        debug!(domain = %self.config.local_key, count = settlement.records.len(), "Local slots settled");
        self.unsettled = None;
        Ok(())
    }

    /// The local slot as it reads once any committed batch is settled.
    fn local_baseline(&self) -> Result<Vec<Record>> {
        let mut records = self.local.read(&self.config.local_key)?;
        if let Some(settlement) = &self.unsettled {
            records.retain(|r| !settlement.origins.contains(&r.id));
            for record in &settlement.records {
                if !records.iter().any(|r| r.id == record.id) {
                    records.push(record.clone());
                }
            }
        }
        Ok(records)
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Wait for the next event of the live query. `None` when detached.
    pub async fn next_delivery(&mut self) -> Option<SnapshotDelivery> {
        self.subscription.next().await
    }

    /// Apply every already queued delivery.
    pub fn pump(&mut self) -> Result<Vec<DeliveryOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(delivery) = self.subscription.try_next() {
            outcomes.push(self.apply_delivery(delivery)?);
        }
        Ok(outcomes)
    }

    /// Apply one delivery. Deliveries from a detached generation are
    /// discarded; an error event detaches and degrades.
    pub fn apply_delivery(&mut self, delivery: SnapshotDelivery) -> Result<DeliveryOutcome> {
        if !self.subscription.is_current(delivery.generation) {
            debug!(
                domain = %self.config.local_key,
                generation = %delivery.generation,
                current = %self.subscription.generation(),
                "Discarding stale snapshot"
            );
            return Ok(DeliveryOutcome::Stale);
        }
        let Some(principal) = self.state.principal().map(str::to_string) else {
            self.subscription.detach();
            return Ok(DeliveryOutcome::Stale);
        };

        match delivery.event {
            Ok(snapshot) => {
                let len = self.replace_from_remote(snapshot, ListSource::Snapshot)?;
                debug!(domain = %self.config.local_key, len, "Snapshot applied");
                Ok(DeliveryOutcome::Applied { len })
            }
            Err(error) => {
                let reason = if error.is_permission_denied() {
                    DegradedReason::SubscriptionDenied
                } else {
                    DegradedReason::SubscriptionLost
                };
                warn!(domain = %self.config.local_key, %principal, ?reason, %error, "Live query ended");
                self.degrade(principal, reason);
                self.report(&SyncError::from(error.clone()));
                Ok(DeliveryOutcome::Lost { error, reason })
            }
        }
    }

    /// One-shot read of the owner's records. Only while connected. On a
    /// failed read the working list falls back to the local slot.
    pub async fn refresh(&mut self) -> Result<usize> {
        let principal = self.connected_principal()?;
        let filter = self.filter_for(&principal);
        match self.remote.query(&self.config.collection, &filter).await {
            Ok(records) => self.replace_from_remote(records, ListSource::Refresh),
            Err(e) => {
                warn!(domain = %self.config.local_key, error = %e, "Refresh failed; serving local slot");
                self.records = self.local.read(&self.config.local_key)?;
                self.emit_list(ListSource::Local);
                Err(e.into())
            }
        }
    }

    /// Replace the working list with remote contents and mirror them to the
    /// local slot. The list is replaced even if the mirror write fails.
    fn replace_from_remote(&mut self, records: Vec<Record>, source: ListSource) -> Result<usize> {
        let records: Vec<Record> = records
            .into_iter()
            .filter(|r| self.config.owns(r))
            .collect();
        let len = records.len();
        let mirrored = self.local.write(&self.config.local_key, &records);
        self.records = records;
        self.emit_list(source);
        mirrored?;
        Ok(len)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Create a record. Connected: remote write, the snapshot echoes it back.
    /// Otherwise: temporary id, appended to the working list and persisted
    /// before returning.
    pub async fn create(&mut self, fields: FieldMap) -> Result<CreateOutcome> {
        let mut fields = without_reserved(fields);
        fields
            .entry(CREATED_AT)
            .or_insert_with(|| Value::String(timestamp_now()));
        if let Some(d) = &self.config.discriminator {
            d.stamp(&mut fields);
        }

        match self.state.clone() {
            ConnectionState::Connected { principal } => self.create_remote(principal, fields).await,
            _ => self.create_local(fields),
        }
    }

    fn create_local(&mut self, fields: FieldMap) -> Result<CreateOutcome> {
        let id = self.ids.generate();
        let mut list = self.records.clone();
        list.push(Record::new(id.clone(), fields));
        self.commit_slot(Slot::Working, list)?;
        debug!(domain = %self.config.local_key, %id, "Created local record");
        Ok(CreateOutcome::Local { id })
    }

    async fn create_remote(&mut self, principal: String, fields: FieldMap) -> Result<CreateOutcome> {
        let mut remote_fields = fields.clone();
        remote_fields.insert(SYNCED_FROM_LOCAL.to_string(), Value::Bool(false));
        let op = CreateOp::new(principal, remote_fields);

        match self.remote.create(&self.config.collection, op).await {
            Ok(id) => {
                debug!(domain = %self.config.local_key, %id, "Created remote record");
                Ok(CreateOutcome::Remote { id })
            }
            Err(error) if error.is_transport() && self.options.degrade_on_create_failure() => {
                let id = self.ids.generate();
                let mut fields = fields;
                fields.insert(PENDING_SYNC.to_string(), Value::Bool(true));
                let mut outbox = self.local.read(&self.config.outbox_key())?;
                outbox.push(Record::new(id.clone(), fields));
                self.commit_slot(Slot::Outbox, outbox)?;
                warn!(domain = %self.config.local_key, %id, %error, "Remote create failed; kept locally");
                self.emit(CoordinatorEvent::Deferred {
                    domain: self.config.local_key.clone(),
                    id: id.clone(),
                });
                Ok(CreateOutcome::Deferred { id, error })
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Overwrite fields of `id` with `patch`.
    pub async fn update(&mut self, id: &str, patch: FieldMap) -> Result<UpdateOutcome> {
        self.update_with(id, move |_| patch).await
    }

    /// Flip a boolean field (and its label) of `id`, reading the flag from
    /// the record in the store the update targets.
    pub async fn toggle(&mut self, id: &str, spec: &ToggleSpec) -> Result<UpdateOutcome> {
        self.update_with(id, |current| spec.patch_for(current)).await
    }

    /// Update `id` with a patch computed from its current value in the
    /// target store. Only fields that differ are written, plus `updatedAt`.
    pub async fn update_with<F>(&mut self, id: &str, make_patch: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&Record) -> FieldMap + Send,
    {
        match self.route_for(id) {
            Route::Local => self.update_local(id, make_patch),
            Route::Remote => {
                let principal = self.connected_principal()?;
                self.update_remote(&principal, id, make_patch).await
            }
        }
    }

    fn update_local<F>(&mut self, id: &str, make_patch: F) -> Result<UpdateOutcome>
    where
        F: FnOnce(&Record) -> FieldMap,
    {
        let slot = self.locate_local(id)?.ok_or_else(|| self.unknown(id))?;
        let mut list = self.slot_records(slot)?;
        let Some(record) = list.iter_mut().find(|r| r.id == id) else {
            return Err(self.unknown(id));
        };
        let patch = make_patch(&*record);
        let changes = changed_fields(record, &patch);
        if changes.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }
        record.apply_patch(&changes);
        record
            .fields
            .insert(UPDATED_AT.to_string(), Value::String(timestamp_now()));
        self.commit_slot(slot, list)?;
        Ok(UpdateOutcome::Local)
    }

    async fn update_remote<F>(
        &mut self,
        principal: &str,
        id: &str,
        make_patch: F,
    ) -> Result<UpdateOutcome>
    where
        F: FnOnce(&Record) -> FieldMap + Send,
    {
        let collection = self.config.collection.clone();
        let Some(current) = self.remote.get_one(&collection, id).await? else {
            debug!(domain = %self.config.local_key, %id, "Update target vanished");
            self.drop_mirror_entry(id)?;
            return Ok(UpdateOutcome::Vanished);
        };
        check_owner(&collection, &current, principal)?;

        let mut changes = changed_fields(&current, &make_patch(&current));
        if changes.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }
        let changed: Vec<String> = changes.keys().cloned().collect();
        changes.insert(UPDATED_AT.to_string(), Value::String(timestamp_now()));

        match self.remote.update(&collection, id, changes).await {
            Ok(()) => Ok(UpdateOutcome::Remote { changed }),
            Err(RemoteError::NotFound { .. }) => {
                self.drop_mirror_entry(id)?;
                Ok(UpdateOutcome::Vanished)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete `id` from the store its id class and the connection state
    /// select.
    pub async fn delete(&mut self, id: &str) -> Result<DeleteOutcome> {
        match self.route_for(id) {
            Route::Local => {
                let slot = self.locate_local(id)?.ok_or_else(|| self.unknown(id))?;
                let mut list = self.slot_records(slot)?;
                list.retain(|r| r.id != id);
                self.commit_slot(slot, list)?;
                Ok(DeleteOutcome::Local)
            }
            Route::Remote => {
                let principal = self.connected_principal()?;
                let collection = self.config.collection.clone();
                let Some(current) = self.remote.get_one(&collection, id).await? else {
                    debug!(domain = %self.config.local_key, %id, "Delete target already gone");
                    self.drop_mirror_entry(id)?;
                    return Ok(DeleteOutcome::AlreadyGone);
                };
                check_owner(&collection, &current, &principal)?;
                self.remote.delete(&collection, id).await?;
                self.drop_mirror_entry(id)?;
                Ok(DeleteOutcome::Remote)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn route_for(&self, id: &str) -> Route {
        route(self.ids.classify(id), self.state.is_connected())
    }

    fn connected_principal(&self) -> Result<String> {
        match &self.state {
            ConnectionState::Connected { principal } => Ok(principal.clone()),
            _ => Err(SyncError::NotConnected),
        }
    }

    fn filter_for(&self, principal: &str) -> QueryFilter {
        QueryFilter::owner(principal).with_discriminator(self.config.discriminator.clone())
    }

    fn unknown(&self, id: &str) -> SyncError {
        SyncError::UnknownRecord {
            domain: self.config.local_key.clone(),
            id: id.to_string(),
        }
    }

    /// Local list holding `id`. While connected the working list is a
    /// snapshot, so only the outbox can hold a temporary record.
    fn locate_local(&self, id: &str) -> Result<Option<Slot>> {
        if !self.state.is_connected() && self.records.iter().any(|r| r.id == id) {
            return Ok(Some(Slot::Working));
        }
        let outbox = self.local.read(&self.config.outbox_key())?;
        Ok(outbox.iter().any(|r| r.id == id).then_some(Slot::Outbox))
    }

    fn slot_records(&self, slot: Slot) -> Result<Vec<Record>> {
        match slot {
            Slot::Working => Ok(self.records.clone()),
            Slot::Outbox => Ok(self.local.read(&self.config.outbox_key())?),
        }
    }

    /// Persist `records` to `slot`; the working list is swapped only after
    /// the write succeeded.
    fn commit_slot(&mut self, slot: Slot, records: Vec<Record>) -> Result<()> {
        match slot {
            Slot::Working => {
                self.local.write(&self.config.local_key, &records)?;
                self.records = records;
                self.emit_list(ListSource::Local);
            }
            Slot::Outbox => {
                self.local.write(&self.config.outbox_key(), &records)?;
                self.emit_outbox(records.len());
            }
        }
        Ok(())
    }

    /// Remove a remotely deleted record from the mirror and the working list.
    fn drop_mirror_entry(&mut self, id: &str) -> Result<()> {
        let mut mirror = self.local.read(&self.config.local_key)?;
        let before = mirror.len();
        mirror.retain(|r| r.id != id);
        if mirror.len() != before {
            self.local.write(&self.config.local_key, &mirror)?;
        }
        if self.records.iter().any(|r| r.id == id) {
            self.records.retain(|r| r.id != id);
            self.emit_list(ListSource::Local);
        }
        Ok(())
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state != state {
            debug!(domain = %self.config.local_key, from = ?self.state, to = ?state, "State change");
        }
        self.state = state;
        self.emit(CoordinatorEvent::StateChanged {
            domain: self.config.local_key.clone(),
            state: self.state.clone(),
        });
    }

    /// Tell listeners about a failure nobody is awaiting.
    pub fn report(&self, err: &SyncError) {
        self.emit(CoordinatorEvent::error(&self.config.local_key, err));
    }

    fn emit(&self, event: CoordinatorEvent) {
        self.events.emit(&event);
    }

    fn emit_list(&self, source: ListSource) {
        self.emit(CoordinatorEvent::ListChanged {
            domain: self.config.local_key.clone(),
            len: self.records.len(),
            source,
        });
    }

    fn emit_outbox(&self, len: usize) {
        self.emit(CoordinatorEvent::OutboxChanged {
            domain: self.config.local_key.clone(),
            len,
        });
    }
}

fn degraded_reason(err: &SyncError) -> DegradedReason {
    match err {
        SyncError::Unreachable { .. } => DegradedReason::Unreachable,
        SyncError::Migration { .. } => DegradedReason::MigrationFailed,
        SyncError::PermissionDenied(_) => DegradedReason::SubscriptionDenied,
        _ => DegradedReason::AttachFailed,
    }
}

impl std::fmt::Debug for SyncCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncCoordinator")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("records", &self.records.len())
            .field("generation", &self.subscription.generation())
            .field("unsettled", &self.unsettled.is_some())
            .finish()
    }
}
