//! Single persistence protocol
//!
//! Both the webhook fast path and the background sweep persist an approved
//! candidate through this one function. The `try_begin_persisting` gate is
//! what lets the two entry points race on the same candidate: exactly one of
//! them gets to insert.

use std::sync::Arc;

use tracing::{error, info};

use crate::models::{Candidate, Incident};
use crate::services::repository::IncidentRepository;
use crate::store::CandidateStore;

/// Outcome of one persistence attempt.
#[derive(Debug)]
pub enum PersistOutcome {
    /// This attempt won the gate and the insert succeeded. `None` means the
    /// repository is unconfigured and nothing was written; the candidate is
    /// still marked persisted so it is not retried forever.
    Inserted(Option<Incident>),
    /// Another attempt is in flight or already completed.
    AlreadyInFlight,
    /// The insert failed; persistence was rolled back so a retry can run.
    Failed,
}

/// Run the begin → insert → mark protocol for one candidate.
pub async fn persist_selected_street(
    store: &CandidateStore,
    repository: &Arc<dyn IncidentRepository>,
    candidate: &Candidate,
    street: &str,
) -> PersistOutcome {
    if !store.try_begin_persisting(&candidate.id) {
        return PersistOutcome::AlreadyInFlight;
    }

    match repository.insert_incident(candidate, street).await {
        Ok(inserted) => {
            store.try_mark_persisted(&candidate.id);
            info!(candidate_id = %candidate.id, street, "Candidate persisted");
            PersistOutcome::Inserted(inserted)
        }
        Err(e) => {
            store.cancel_persisting(&candidate.id);
            error!(candidate_id = %candidate.id, "Failed to persist candidate: {}", e);
            PersistOutcome::Failed
        }
    }
}
