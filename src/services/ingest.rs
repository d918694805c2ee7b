//! RSS ingestion loop
//!
//! Periodically fetches candidates, registers the unseen ones, and announces
//! them in the review chat. Registration is the dedup gate: feeds redeliver
//! old items on every poll and those fail `register` silently.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::services::rss::CandidateFetcher;
use crate::services::telegram::Notifier;
use crate::store::CandidateStore;

/// Run one fetch-register-announce cycle. Returns how many new candidates
/// were registered.
pub async fn poll_once(
    store: &CandidateStore,
    fetcher: &Arc<dyn CandidateFetcher>,
    notifier: &Arc<dyn Notifier>,
) -> crate::error::Result<usize> {
    let candidates = fetcher.fetch_candidates().await?;

    let mut added = 0;
    for candidate in candidates {
        if !store.register(candidate.clone()) {
            continue;
        }
        added += 1;

        // The token is minted inside register; a missing one would mean the
        // registration was rolled back, which register reports as false.
        let Some(callback_token) = store.token_for(&candidate.id) else {
            continue;
        };

        match notifier.send_candidate(&candidate, &callback_token).await {
            Ok(Some(message_id)) => {
                store.try_mark_notified(&candidate.id, message_id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(candidate_id = %candidate.id, "Failed to announce candidate: {}", e);
            }
        }
    }

    Ok(added)
}

/// Long-running ingestion task. Sleeps the configured interval between
/// cycles and exits promptly on cancellation; fetch failures are logged and
/// the next tick retries with no backoff.
pub async fn run_ingest_loop(
    store: Arc<CandidateStore>,
    fetcher: Arc<dyn CandidateFetcher>,
    notifier: Arc<dyn Notifier>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    info!(interval_seconds = interval.as_secs(), "RSS ingestion loop started");

    while !shutdown.is_cancelled() {
        match poll_once(&store, &fetcher, &notifier).await {
            Ok(added) if added > 0 => info!(added, "Registered new RSS candidates"),
            Ok(_) => {}
            Err(e) => error!("Failed to poll RSS feed: {}", e),
        }

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!("RSS ingestion loop stopped");
}
