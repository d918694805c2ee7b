//! Concurrent candidate registry
//!
//! Sole owner of every [`PendingCandidate`], the id ↔ callback-token maps,
//! and the per-chat manual-street prompt routing. All state transitions go
//! through here; each one locks only the entry it touches, so unrelated
//! candidates never contend.
//!
//! The store is memory-resident. A process restart loses pending candidates;
//! stale buttons from before the restart resolve to nothing and get an
//! "expired" reply.

mod token;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::{Candidate, Decision, PendingCandidate};

pub use token::TOKEN_LEN;

/// Concurrent registry of candidates under review.
#[derive(Debug, Default)]
pub struct CandidateStore {
    /// Keyed by lower-cased candidate id
    candidates: DashMap<String, PendingCandidate>,
    /// Lower-cased candidate id → callback token
    tokens_by_id: DashMap<String, String>,
    /// Callback token → candidate id as originally registered
    ids_by_token: DashMap<String, String>,
    /// Chat id → candidate id currently prompted for manual street entry
    manual_requests: DashMap<String, String>,
}

fn key_for(candidate_id: &str) -> String {
    candidate_id.to_lowercase()
}

impl CandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new candidate and mint its callback token. Fails when the id
    /// is already registered (case-insensitive), or — after one salted
    /// retry — when the token collides, in which case the candidate insert
    /// is rolled back so the store never holds a candidate without a
    /// resolvable token.
    pub fn register(&self, candidate: Candidate) -> bool {
        let key = key_for(&candidate.id);
        let original_id = candidate.id.clone();

        match self.candidates.entry(key.clone()) {
            Entry::Occupied(_) => return false,
            Entry::Vacant(slot) => {
                slot.insert(PendingCandidate::new(candidate));
            }
        }

        let token = match self.claim_token(token::derive(&key), &original_id) {
            Some(token) => Some(token),
            None => {
                let salted = token::derive_salted(&key, &Uuid::new_v4());
                self.claim_token(salted, &original_id)
            }
        };

        match token {
            Some(token) => {
                self.tokens_by_id.insert(key, token);
                true
            }
            None => {
                self.candidates.remove(&key);
                false
            }
        }
    }

    fn claim_token(&self, candidate_token: String, candidate_id: &str) -> Option<String> {
        match self.ids_by_token.entry(candidate_token.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(candidate_id.to_string());
                Some(candidate_token)
            }
        }
    }

    /// Point-in-time copy of one candidate's state.
    pub fn get(&self, candidate_id: &str) -> Option<PendingCandidate> {
        self.candidates
            .get(&key_for(candidate_id))
            .map(|entry| entry.value().clone())
    }

    pub fn try_mark_notified(&self, candidate_id: &str, message_id: i64) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_mark_notified(message_id))
    }

    pub fn try_set_decision(&self, candidate_id: &str, decision: Decision) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_set_decision(decision))
    }

    pub fn try_set_street_options(&self, candidate_id: &str, options: Vec<String>) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_set_street_options(options))
    }

    pub fn try_select_street(&self, candidate_id: &str, street: &str) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_select_street(street))
    }

    /// Open the manual-entry prompt for a candidate and remember which chat
    /// was prompted, so the free-text reply can be routed back. The last
    /// prompt sent to a chat wins the routing slot.
    pub fn try_begin_manual_street(&self, candidate_id: &str, chat_id: &str) -> bool {
        let begun =
            self.with_candidate(candidate_id, |pending| pending.try_begin_manual_street());

        if begun {
            self.manual_requests
                .insert(chat_id.to_string(), key_for(candidate_id));
        }

        begun
    }

    pub fn try_select_manual_street(&self, candidate_id: &str, street: &str) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_select_manual_street(street))
    }

    pub fn cancel_manual_street(&self, candidate_id: &str) {
        self.with_candidate(candidate_id, |pending| {
            pending.cancel_manual_street();
            true
        });
    }

    /// The candidate this chat was last prompted to type a street for.
    pub fn manual_request_for_chat(&self, chat_id: &str) -> Option<String> {
        self.manual_requests
            .get(chat_id)
            .map(|entry| entry.value().clone())
    }

    /// Drop the prompt routing for a chat, but only while it still points at
    /// the given candidate.
    pub fn clear_manual_request(&self, chat_id: &str, candidate_id: &str) {
        let key = key_for(candidate_id);
        self.manual_requests
            .remove_if(chat_id, |_, routed| *routed == key);
    }

    pub fn try_begin_persisting(&self, candidate_id: &str) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_begin_persisting())
    }

    pub fn try_mark_persisted(&self, candidate_id: &str) -> bool {
        self.with_candidate(candidate_id, |pending| pending.try_mark_persisted())
    }

    pub fn cancel_persisting(&self, candidate_id: &str) {
        self.with_candidate(candidate_id, |pending| {
            pending.cancel_persisting();
            true
        });
    }

    /// Resolve an inbound callback token to the candidate id it was minted
    /// for.
    pub fn candidate_id_for_token(&self, candidate_token: &str) -> Option<String> {
        self.ids_by_token
            .get(candidate_token)
            .map(|entry| entry.value().clone())
    }

    pub fn token_for(&self, candidate_id: &str) -> Option<String> {
        self.tokens_by_id
            .get(&key_for(candidate_id))
            .map(|entry| entry.value().clone())
    }

    /// Point-in-time copy of every candidate for background sweeps. Entries
    /// are individually consistent; the collection as a whole is not a
    /// linearizable snapshot.
    pub fn snapshot(&self) -> Vec<PendingCandidate> {
        self.candidates
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Run one guarded transition while holding only this candidate's entry
    /// lock. Absent ids report `false`.
    fn with_candidate<F>(&self, candidate_id: &str, transition: F) -> bool
    where
        F: FnOnce(&mut PendingCandidate) -> bool,
    {
        match self.candidates.get_mut(&key_for(candidate_id)) {
            Some(mut entry) => transition(entry.value_mut()),
            None => false,
        }
    }
}
