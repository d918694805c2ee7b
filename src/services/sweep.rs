//! Approved-candidate sweep
//!
//! Background safety net behind the webhook fast path: periodically scans
//! the store for approved candidates with a selected street that have not
//! been persisted yet (missed by the fast path, or rolled back after a
//! failed insert) and persists them. Racing the fast path on the same
//! candidate is safe; the persistence gate admits exactly one attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::models::{Decision, PersistState};
use crate::services::persist::{persist_selected_street, PersistOutcome};
use crate::services::repository::IncidentRepository;
use crate::store::CandidateStore;

/// Run one sweep over the snapshot. Returns how many candidates were
/// persisted this cycle. Per-candidate failures are logged by the protocol
/// and the sweep moves on.
pub async fn sweep_once(
    store: &CandidateStore,
    repository: &Arc<dyn IncidentRepository>,
) -> usize {
    let mut persisted = 0;

    for pending in store.snapshot() {
        if pending.decision() != Decision::Approved {
            continue;
        }
        if pending.persist_state() != PersistState::NotPersisted {
            continue;
        }
        let Some(street) = pending.selected_street().filter(|s| !s.trim().is_empty()) else {
            continue;
        };

        let street = street.to_string();
        if let PersistOutcome::Inserted(_) =
            persist_selected_street(store, repository, pending.candidate(), &street).await
        {
            persisted += 1;
        }
    }

    persisted
}

/// Long-running sweep task. Exits promptly on cancellation.
pub async fn run_sweep_loop(
    store: Arc<CandidateStore>,
    repository: Arc<dyn IncidentRepository>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!(interval_seconds = interval.as_secs(), "Approval sweep loop started");

    while !shutdown.is_cancelled() {
        let persisted = sweep_once(&store, &repository).await;
        if persisted > 0 {
            info!(persisted, "Sweep persisted approved candidates");
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("Approval sweep loop stopped");
}
