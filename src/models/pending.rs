//! Per-candidate review lifecycle
//!
//! State progression:
//! Pending → (Approved | Rejected), then for approved candidates
//! street options → selected street (inline or manual) → persisting → persisted.
//!
//! Every mutator is a guarded compare-and-set: it reports whether it actually
//! changed state and never treats "already set" as an error. Losing a race is
//! an expected outcome for callers, not a failure.

use crate::models::Candidate;

/// Reviewer verdict on a candidate.
///
/// Transitions exactly once, from `Pending` to either terminal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

/// Persistence progress for an approved candidate.
///
/// `Persisting` is the exclusivity gate: at most one insert attempt may hold
/// it at a time. `Persisted` is permanent; a failed attempt rolls back to
/// `NotPersisted` so a later retry can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistState {
    NotPersisted,
    Persisting,
    Persisted,
}

/// A candidate plus its review workflow state. Owned and mutated only by the
/// candidate store.
#[derive(Debug, Clone)]
pub struct PendingCandidate {
    candidate: Candidate,
    decision: Decision,
    notified_message_id: Option<i64>,
    street_options: Vec<String>,
    selected_street: Option<String>,
    awaiting_manual_street: bool,
    persist_state: PersistState,
}

impl PendingCandidate {
    pub fn new(candidate: Candidate) -> Self {
        Self {
            candidate,
            decision: Decision::Pending,
            notified_message_id: None,
            street_options: Vec::new(),
            selected_street: None,
            awaiting_manual_street: false,
            persist_state: PersistState::NotPersisted,
        }
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn notified_message_id(&self) -> Option<i64> {
        self.notified_message_id
    }

    pub fn street_options(&self) -> &[String] {
        &self.street_options
    }

    pub fn selected_street(&self) -> Option<&str> {
        self.selected_street.as_deref()
    }

    pub fn is_awaiting_manual_street(&self) -> bool {
        self.awaiting_manual_street
    }

    pub fn persist_state(&self) -> PersistState {
        self.persist_state
    }

    pub fn is_persisted(&self) -> bool {
        self.persist_state == PersistState::Persisted
    }

    /// Record the chat message this candidate was announced with. Set at most
    /// once.
    pub fn try_mark_notified(&mut self, message_id: i64) -> bool {
        if self.notified_message_id.is_some() {
            return false;
        }

        self.notified_message_id = Some(message_id);
        true
    }

    /// Single-fire decision. Fails once any decision has been made, even when
    /// the new value matches the current one.
    pub fn try_set_decision(&mut self, decision: Decision) -> bool {
        if self.decision != Decision::Pending {
            return false;
        }

        self.decision = decision;
        true
    }

    /// Record the street options offered to the reviewer. Set at most once,
    /// and never to an empty list.
    pub fn try_set_street_options(&mut self, options: Vec<String>) -> bool {
        if options.is_empty() || !self.street_options.is_empty() {
            return false;
        }

        self.street_options = options;
        true
    }

    /// Select the street for an approved candidate. Fails before approval,
    /// for a blank street, and once a street has been selected.
    pub fn try_select_street(&mut self, street: &str) -> bool {
        if self.decision != Decision::Approved {
            return false;
        }

        if street.trim().is_empty() {
            return false;
        }

        if self.selected_street.is_some() {
            return false;
        }

        self.selected_street = Some(street.to_string());
        true
    }

    /// Open the manual-entry prompt window. Only one prompt may be open, and
    /// only while no street has been selected.
    pub fn try_begin_manual_street(&mut self) -> bool {
        if self.decision != Decision::Approved {
            return false;
        }

        if self.awaiting_manual_street || self.selected_street.is_some() {
            return false;
        }

        self.awaiting_manual_street = true;
        true
    }

    /// Accept a typed street while the manual prompt is open. When the prompt
    /// lost the race to an inline selection, the prompt window is closed even
    /// though the call reports failure.
    pub fn try_select_manual_street(&mut self, street: &str) -> bool {
        if !self.awaiting_manual_street {
            return false;
        }

        if !self.try_select_street(street) {
            if self.selected_street.is_some() {
                self.awaiting_manual_street = false;
            }

            return false;
        }

        self.awaiting_manual_street = false;
        true
    }

    /// Close the manual prompt window without selecting. No-op once a street
    /// has been selected (the prompt was already closed by the selection).
    pub fn cancel_manual_street(&mut self) {
        if self.selected_street.is_none() {
            self.awaiting_manual_street = false;
        }
    }

    /// Claim the exclusive right to run one persistence attempt. Only
    /// approved candidates ever reach the backing store.
    pub fn try_begin_persisting(&mut self) -> bool {
        if self.decision != Decision::Approved {
            return false;
        }

        if self.persist_state != PersistState::NotPersisted {
            return false;
        }

        self.persist_state = PersistState::Persisting;
        true
    }

    /// Record a completed insert. Permanent.
    pub fn try_mark_persisted(&mut self) -> bool {
        if self.persist_state == PersistState::Persisted {
            return false;
        }

        self.persist_state = PersistState::Persisted;
        true
    }

    /// Roll a failed attempt back so a later retry can claim the gate again.
    pub fn cancel_persisting(&mut self) {
        if self.persist_state == PersistState::Persisting {
            self.persist_state = PersistState::NotPersisted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingCandidate {
        PendingCandidate::new(Candidate::new(
            "item-1",
            "Fire on Main St",
            "https://example.com/article/1",
            None,
            None,
        ))
    }

    fn approved() -> PendingCandidate {
        let mut p = pending();
        assert!(p.try_set_decision(Decision::Approved));
        p
    }

    #[test]
    fn decision_fires_exactly_once() {
        let mut p = pending();

        assert!(p.try_set_decision(Decision::Approved));
        assert!(!p.try_set_decision(Decision::Approved));
        assert!(!p.try_set_decision(Decision::Rejected));
        assert_eq!(p.decision(), Decision::Approved);
    }

    #[test]
    fn mark_notified_sets_once() {
        let mut p = pending();

        assert!(p.try_mark_notified(42));
        assert!(!p.try_mark_notified(43));
        assert_eq!(p.notified_message_id(), Some(42));
    }

    #[test]
    fn street_options_reject_empty_and_resets() {
        let mut p = approved();

        assert!(!p.try_set_street_options(Vec::new()));
        assert!(p.try_set_street_options(vec!["Strada A".into()]));
        assert!(!p.try_set_street_options(vec!["Strada B".into()]));
        assert_eq!(p.street_options(), ["Strada A".to_string()]);
    }

    #[test]
    fn street_selection_requires_approval() {
        let mut p = pending();
        assert!(!p.try_select_street("Strada A"));

        let mut rejected = pending();
        rejected.try_set_decision(Decision::Rejected);
        assert!(!rejected.try_select_street("Strada A"));
    }

    #[test]
    fn street_selection_fires_exactly_once() {
        let mut p = approved();

        assert!(!p.try_select_street("  "));
        assert!(p.try_select_street("Strada A"));
        assert!(!p.try_select_street("Strada B"));
        assert_eq!(p.selected_street(), Some("Strada A"));
    }

    #[test]
    fn manual_street_requires_approval_and_no_selection() {
        let mut p = pending();
        assert!(!p.try_begin_manual_street());

        let mut p = approved();
        assert!(p.try_begin_manual_street());
        assert!(!p.try_begin_manual_street());

        let mut p = approved();
        p.try_select_street("Strada A");
        assert!(!p.try_begin_manual_street());
    }

    #[test]
    fn manual_selection_closes_prompt() {
        let mut p = approved();
        assert!(p.try_begin_manual_street());
        assert!(p.try_select_manual_street("Strada B"));
        assert!(!p.is_awaiting_manual_street());
        assert_eq!(p.selected_street(), Some("Strada B"));
    }

    #[test]
    fn manual_selection_without_prompt_fails() {
        let mut p = approved();
        assert!(!p.try_select_manual_street("Strada B"));
        assert!(p.selected_street().is_none());
    }

    #[test]
    fn manual_selection_losing_race_still_closes_prompt() {
        let mut p = approved();
        assert!(p.try_begin_manual_street());

        // Inline selection wins while the prompt is open. The selection guard
        // keeps the mutual exclusion invariant by clearing the prompt flag.
        assert!(p.try_select_street("Strada A"));
        assert!(p.is_awaiting_manual_street());

        assert!(!p.try_select_manual_street("Strada B"));
        assert!(!p.is_awaiting_manual_street());
        assert_eq!(p.selected_street(), Some("Strada A"));
    }

    #[test]
    fn manual_selection_of_blank_street_keeps_prompt_open() {
        let mut p = approved();
        assert!(p.try_begin_manual_street());
        assert!(!p.try_select_manual_street("   "));
        assert!(p.is_awaiting_manual_street());
    }

    #[test]
    fn cancel_manual_street_is_noop_after_selection() {
        let mut p = approved();
        assert!(p.try_begin_manual_street());
        p.cancel_manual_street();
        assert!(!p.is_awaiting_manual_street());

        let mut p = approved();
        p.try_select_street("Strada A");
        p.cancel_manual_street();
        assert_eq!(p.selected_street(), Some("Strada A"));
    }

    #[test]
    fn persist_gate_requires_approval() {
        let mut p = pending();
        assert!(!p.try_begin_persisting());

        let mut rejected = pending();
        rejected.try_set_decision(Decision::Rejected);
        assert!(!rejected.try_begin_persisting());
    }

    #[test]
    fn persist_gate_admits_one_attempt() {
        let mut p = approved();

        assert!(p.try_begin_persisting());
        assert!(!p.try_begin_persisting());
        assert_eq!(p.persist_state(), PersistState::Persisting);

        assert!(p.try_mark_persisted());
        assert_eq!(p.persist_state(), PersistState::Persisted);
        assert!(!p.try_mark_persisted());
        assert!(!p.try_begin_persisting());
    }

    #[test]
    fn failed_persist_rolls_back_for_retry() {
        let mut p = approved();

        assert!(p.try_begin_persisting());
        p.cancel_persisting();
        assert_eq!(p.persist_state(), PersistState::NotPersisted);

        assert!(p.try_begin_persisting());
        assert!(p.try_mark_persisted());

        // Cancellation after completion must not reopen the gate.
        p.cancel_persisting();
        assert_eq!(p.persist_state(), PersistState::Persisted);
    }
}
