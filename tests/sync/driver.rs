//! CoordinatorDriver tests: the select loop, the handle, and reconnects.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use bizdash_sync::domain::Domain;
use bizdash_sync::error::{ErrorKind, RemoteError, SyncError};
use bizdash_sync::reactive::CoordinatorEvent;
use bizdash_sync::remote::{MemoryRemoteStore, RemoteOp};
use bizdash_sync::storage::MemoryLocalStore;
use bizdash_sync::sync::{
    ConnectionState, CoordinatorDriver, CoordinatorHandle, CoordinatorOptions, CreateOutcome,
    DegradedReason, IdentityEvent, SyncCoordinator, ToggleSpec, UpdateOutcome,
};

use super::support::{fast_options, fields, record};

// ============================================================================
// Helpers
// ============================================================================

struct Running {
    remote: MemoryRemoteStore,
    identity: mpsc::UnboundedSender<IdentityEvent>,
    handle: CoordinatorHandle,
    task: JoinHandle<SyncCoordinator>,
    events: Arc<Mutex<Vec<CoordinatorEvent>>>,
}

fn spawn(domain: Domain, options: CoordinatorOptions) -> Running {
    let remote = MemoryRemoteStore::new();
    let coordinator = SyncCoordinator::new(
        domain,
        Arc::new(MemoryLocalStore::new()),
        Arc::new(remote.clone()),
        options,
    )
    .unwrap();
    let (identity, identity_rx) = mpsc::unbounded_channel();
    let (driver, handle) = CoordinatorDriver::new(coordinator, identity_rx);

    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    handle
        .events()
        .on(move |e: &CoordinatorEvent| log.lock().push(e.clone()));

    let task = tokio::spawn(driver.run());
    Running {
        remote,
        identity,
        handle,
        task,
        events,
    }
}

/// Poll `check` until it holds or a second has passed.
async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

async fn wait_for_state(handle: &CoordinatorHandle, want: &ConnectionState) -> bool {
    for _ in 0..200 {
        if handle.state().await.ok().as_ref() == Some(want) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

fn connected(principal: &str) -> ConnectionState {
    ConnectionState::Connected {
        principal: principal.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn identity_event_is_handled_before_queued_command() {
    let run = spawn(Domain::Clients, fast_options());
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();

    let outcome = run
        .handle
        .create(fields(json!({"label": "Acme"})))
        .await
        .unwrap();
    assert!(matches!(outcome, CreateOutcome::Remote { .. }));

    let records = run.handle.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, outcome.id());
}

#[tokio::test]
async fn offline_commands_then_sign_in_migrates() {
    let run = spawn(Domain::Clients, fast_options());
    let outcome = run
        .handle
        .create(fields(json!({"label": "Acme", "value": "100"})))
        .await
        .unwrap();
    assert!(matches!(outcome, CreateOutcome::Local { .. }));

    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    assert!(wait_for_state(&run.handle, &connected("u1")).await);

    let records = run.handle.records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert!(!records[0].id.starts_with("tmp-"));
    assert_eq!(run.remote.documents("clients").len(), 1);
}

#[tokio::test]
async fn handle_mutations_round_trip() {
    let run = spawn(Domain::UpskillTasks, fast_options());
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    let id = run
        .handle
        .create(fields(json!({"title": "Ship it", "completed": false})))
        .await
        .unwrap()
        .id()
        .to_string();

    let outcome = run
        .handle
        .toggle(id.clone(), ToggleSpec::completion())
        .await
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Remote { .. }));
    let outcome = run
        .handle
        .update(id.clone(), fields(json!({"title": "Shipped"})))
        .await
        .unwrap();
    assert!(matches!(outcome, UpdateOutcome::Remote { .. }));

    let records = run.handle.records().await.unwrap();
    assert_eq!(records[0].get("status"), Some(&json!("completed")));
    assert_eq!(records[0].get("title"), Some(&json!("Shipped")));

    run.handle.delete(id).await.unwrap();
    assert!(run.handle.records().await.unwrap().is_empty());
    assert_eq!(run.handle.refresh().await.unwrap(), 0);
}

#[tokio::test]
async fn permission_violation_reaches_the_caller() {
    let run = spawn(Domain::Clients, fast_options());
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    assert!(wait_for_state(&run.handle, &connected("u1")).await);
    run.remote
        .insert("clients", record(json!({"id": "doc-x", "ownerId": "u2"})));

    let err = run.handle.delete("doc-x").await.unwrap_err();
    assert!(matches!(err, SyncError::PermissionViolation { .. }));
    assert!(run.remote.document("clients", "doc-x").is_some());
}

#[tokio::test]
async fn sign_out_event_returns_to_local_mode() {
    let run = spawn(Domain::Clients, fast_options());
    run.remote
        .insert("clients", record(json!({"id": "doc-a", "ownerId": "u1"})));
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    assert!(wait_for_state(&run.handle, &connected("u1")).await);

    run.identity.send(IdentityEvent::SignedOut).unwrap();
    assert!(wait_for_state(&run.handle, &ConnectionState::Disconnected).await);
    assert_eq!(run.remote.subscriber_count(), 0);

    let outcome = run
        .handle
        .create(fields(json!({"label": "offline"})))
        .await
        .unwrap();
    assert!(matches!(outcome, CreateOutcome::Local { .. }));
    assert_eq!(run.handle.records().await.unwrap().len(), 2);
}

#[tokio::test]
async fn lost_subscription_is_reattached_automatically() {
    let run = spawn(Domain::Clients, fast_options());
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    assert!(wait_for_state(&run.handle, &connected("u1")).await);

    run.remote
        .break_subscriptions("clients", RemoteError::transport("socket closed"));
    let remote = run.remote.clone();
    assert!(eventually(|| remote.call_count(RemoteOp::Subscribe) == 2).await);
    assert!(wait_for_state(&run.handle, &connected("u1")).await);
    assert_eq!(run.remote.subscriber_count(), 1);
}

#[tokio::test]
async fn reconnect_gives_up_after_budget() {
    let options = CoordinatorOptions {
        reconnect_attempts: Some(2),
        probe_attempts: Some(1),
        ..fast_options()
    };
    let run = spawn(Domain::Clients, options);
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    assert!(wait_for_state(&run.handle, &connected("u1")).await);

    run.remote.set_offline(true);
    run.remote
        .break_subscriptions("clients", RemoteError::transport("socket closed"));

    let events = run.events.clone();
    assert!(
        eventually(|| events.lock().iter().any(|e| matches!(
            e,
            CoordinatorEvent::Error {
                kind: ErrorKind::Unreachable,
                ..
            }
        )))
        .await
    );
    // One probe at sign-in, one per reconnect attempt.
    assert_eq!(run.remote.call_count(RemoteOp::Probe), 3);
    assert!(matches!(
        run.handle.state().await.unwrap(),
        ConnectionState::Degraded {
            reason: DegradedReason::Unreachable,
            ..
        }
    ));

    // Manual reconnect still works once the store is back.
    run.remote.set_offline(false);
    run.handle.reconnect().await.unwrap();
    assert_eq!(run.handle.state().await.unwrap(), connected("u1"));
}

#[tokio::test]
async fn denied_subscription_is_not_retried() {
    let run = spawn(Domain::Clients, fast_options());
    run.identity
        .send(IdentityEvent::SignedIn("u1".into()))
        .unwrap();
    assert!(wait_for_state(&run.handle, &connected("u1")).await);

    run.remote
        .break_subscriptions("clients", RemoteError::permission_denied("rules"));
    let denied = ConnectionState::Degraded {
        principal: "u1".into(),
        reason: DegradedReason::SubscriptionDenied,
    };
    assert!(wait_for_state(&run.handle, &denied).await);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(run.remote.call_count(RemoteOp::Subscribe), 1);
}

#[tokio::test]
async fn driver_stops_when_handles_are_dropped() {
    let run = spawn(Domain::Clients, fast_options());
    run.handle
        .create(fields(json!({"label": "Acme"})))
        .await
        .unwrap();
    let Running { handle, task, .. } = run;
    let extra = handle.clone();
    drop(handle);
    drop(extra);

    let coordinator = task.await.unwrap();
    assert_eq!(coordinator.records().len(), 1);
    assert_eq!(coordinator.state(), &ConnectionState::Disconnected);
}

#[tokio::test]
async fn handle_reports_disposed_after_driver_is_gone() {
    let run = spawn(Domain::Clients, fast_options());
    run.task.abort();
    let _ = run.task.await;

    let err = run.handle.records().await.unwrap_err();
    assert!(matches!(err, SyncError::Disposed));
    let err = run
        .handle
        .create(fields(json!({"label": "late"})))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Disposed));
}
