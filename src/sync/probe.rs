//! Connectivity probe with a fixed-delay retry budget.

use tracing::{debug, warn};

use crate::error::{RemoteError, Result, SyncError};
use crate::remote::RemoteStore;

use super::types::RetryPolicy;

/// Probe `collection` until it answers or `policy.attempts` run out.
///
/// A permission-denied answer proves the store is reachable and counts as
/// success. Returns the number of attempts used.
pub async fn probe_with_retry(
    remote: &dyn RemoteStore,
    collection: &str,
    policy: &RetryPolicy,
) -> Result<u32> {
    let attempts = policy.attempts.max(1);
    let mut last = RemoteError::transport("probe not attempted");

    for attempt in 1..=attempts {
        match remote.probe(collection).await {
            Ok(()) => return Ok(attempt),
            Err(RemoteError::PermissionDenied(message)) => {
                debug!(collection, attempt, %message, "Probe denied; store is reachable");
                return Ok(attempt);
            }
            Err(e) => {
                warn!(collection, attempt, attempts, error = %e, "Connectivity probe failed");
                last = e;
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    Err(SyncError::Unreachable { attempts, last })
}
