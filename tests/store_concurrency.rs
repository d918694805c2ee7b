//! Concurrency properties of the candidate store
//!
//! Guarded transitions must admit exactly one winner when hammered from many
//! tasks, and losers must observe a clean `false`.

use std::sync::Arc;

use firewatch::models::{Candidate, Decision, PersistState};
use firewatch::store::CandidateStore;

const RACERS: usize = 32;

fn candidate(id: &str) -> Candidate {
    Candidate::new(id, "Fire downtown", "https://example.com/a/1", None, None)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_registration_admits_exactly_one() {
    let store = Arc::new(CandidateStore::new());

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let store = Arc::clone(&store);
        // Case variants must all collide on the same identity.
        let id = if i % 2 == 0 { "Item-1" } else { "ITEM-1" };
        handles.push(tokio::spawn(async move { store.register(candidate(id)) }));
    }

    let mut registered = 0;
    for handle in handles {
        if handle.await.unwrap() {
            registered += 1;
        }
    }

    assert_eq!(registered, 1);
    assert_eq!(store.len(), 1);
    assert!(store.token_for("item-1").is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_decisions_admit_exactly_one() {
    let store = Arc::new(CandidateStore::new());
    store.register(candidate("item-1"));

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let store = Arc::clone(&store);
        let decision = if i % 2 == 0 {
            Decision::Approved
        } else {
            Decision::Rejected
        };
        handles.push(tokio::spawn(async move {
            store.try_set_decision("item-1", decision)
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);
    assert_ne!(store.get("item-1").unwrap().decision(), Decision::Pending);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_street_selection_admits_exactly_one() {
    let store = Arc::new(CandidateStore::new());
    store.register(candidate("item-1"));
    store.try_set_decision("item-1", Decision::Approved);

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let store = Arc::clone(&store);
        let street = format!("Strada {}", i);
        handles.push(tokio::spawn(async move {
            store.try_select_street("item-1", &street)
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }

    assert_eq!(wins, 1);
    assert!(store.get("item-1").unwrap().selected_street().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn persistence_gate_admits_one_of_n_and_reopens_after_cancel() {
    let store = Arc::new(CandidateStore::new());
    store.register(candidate("item-1"));
    store.try_set_decision("item-1", Decision::Approved);
    store.try_select_street("item-1", "Strada Mare");

    let mut handles = Vec::new();
    for _ in 0..RACERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.try_begin_persisting("item-1")
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    // Simulated insert failure: roll back, then a fresh attempt must win the
    // gate again.
    store.cancel_persisting("item-1");
    assert_eq!(
        store.get("item-1").unwrap().persist_state(),
        PersistState::NotPersisted
    );
    assert!(store.try_begin_persisting("item-1"));

    // Completion is permanent; the gate never reopens.
    assert!(store.try_mark_persisted("item-1"));
    store.cancel_persisting("item-1");
    assert!(!store.try_begin_persisting("item-1"));
    assert!(store.get("item-1").unwrap().is_persisted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn transitions_on_distinct_candidates_do_not_interfere() {
    let store = Arc::new(CandidateStore::new());
    for i in 0..RACERS {
        store.register(candidate(&format!("item-{}", i)));
    }

    let mut handles = Vec::new();
    for i in 0..RACERS {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let id = format!("item-{}", i);
            store.try_set_decision(&id, Decision::Approved)
                && store.try_select_street(&id, "Strada Mare")
                && store.try_begin_persisting(&id)
                && store.try_mark_persisted(&id)
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap());
    }

    assert!(store.snapshot().iter().all(|p| p.is_persisted()));
}
