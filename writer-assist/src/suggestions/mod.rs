//! Suggestion ledger and its lifecycle.
//!
//! Every speculatively applied edit gets exactly one ledger entry, kept for
//! the life of the session. State only moves `Applied -> Accepted` or
//! `Applied -> Rejected`; each move is also recorded as a transition.

mod applier;
mod reconcile;

pub use applier::{apply_proposal, AppliedEdit, ApplyError};
pub use reconcile::{
    compensate, CompensationPolicy, ReconcileError, ReconciliationController, Resolution,
};

use chrono::Utc;
use shared_types::{
    Compensation, LedgerTransition, MessageId, Suggestion, SuggestionId, SuggestionState,
};

use crate::classifier::Proposal;

#[derive(Debug, Clone, Default)]
pub struct SuggestionLedger {
    entries: Vec<Suggestion>,
    transitions: Vec<LedgerTransition>,
    last_id: u64,
}

impl SuggestionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an edit that has already been applied to the document.
    pub fn record_applied(
        &mut self,
        proposal: &Proposal,
        edit: AppliedEdit,
        originating_message_id: MessageId,
    ) -> Suggestion {
        self.last_id += 1;
        let now = Utc::now();
        let explanation = Some(proposal.explanation.clone()).filter(|text| !text.is_empty());
        let suggestion = Suggestion {
            id: SuggestionId(self.last_id),
            kind: proposal.kind,
            content: proposal.content.clone(),
            explanation,
            state: SuggestionState::Applied,
            applied_as: edit.applied_as,
            range: edit.range,
            replaced_text: edit.replaced_text,
            before_fingerprint: edit.before_fingerprint,
            after_fingerprint: edit.after_fingerprint,
            compensation: None,
            applied_at: now,
            resolved_at: None,
            originating_message_id,
        };

        self.entries.push(suggestion.clone());
        self.transitions.push(LedgerTransition {
            suggestion_id: suggestion.id,
            from: None,
            to: SuggestionState::Applied,
            at: now,
        });
        suggestion
    }

    pub fn get(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn state_of(&self, id: SuggestionId) -> Option<SuggestionState> {
        self.get(id).map(|entry| entry.state)
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[Suggestion] {
        &self.entries
    }

    pub fn with_state(&self, state: SuggestionState) -> impl Iterator<Item = &Suggestion> {
        self.entries.iter().filter(move |entry| entry.state == state)
    }

    pub fn transitions(&self) -> &[LedgerTransition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move an `Applied` entry to a terminal state.
    ///
    /// Callers check terminality first; a terminal entry is returned unchanged.
    pub(crate) fn finalize(
        &mut self,
        id: SuggestionId,
        to: SuggestionState,
        compensation: Compensation,
    ) -> Option<Suggestion> {
        let entry = self.entries.iter_mut().find(|entry| entry.id == id)?;
        if entry.state.is_terminal() {
            return Some(entry.clone());
        }

        let now = Utc::now();
        let from = entry.state;
        entry.state = to;
        entry.resolved_at = Some(now);
        entry.compensation = Some(compensation);
        let resolved = entry.clone();

        self.transitions.push(LedgerTransition {
            suggestion_id: id,
            from: Some(from),
            to,
            at: now,
        });
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{ApplyMode, SuggestionKind, TextRange};

    fn edit() -> AppliedEdit {
        AppliedEdit {
            applied_as: ApplyMode::InsertedAtCursor,
            range: TextRange::new(0, 2),
            replaced_text: None,
            before_fingerprint: "before".to_string(),
            after_fingerprint: "after".to_string(),
        }
    }

    #[test]
    fn ids_are_monotonic_and_order_is_preserved() {
        let mut ledger = SuggestionLedger::new();
        let proposal = Proposal::new(SuggestionKind::Insert, "hi", "");
        let first = ledger.record_applied(&proposal, edit(), MessageId(2));
        let second = ledger.record_applied(&proposal, edit(), MessageId(4));

        assert_eq!(first.id, SuggestionId(1));
        assert_eq!(second.id, SuggestionId(2));
        let ids: Vec<_> = ledger.entries().iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![SuggestionId(1), SuggestionId(2)]);
        assert_eq!(first.explanation, None);
        assert_eq!(ledger.transitions().len(), 2);
    }

    #[test]
    fn finalize_is_one_shot() {
        let mut ledger = SuggestionLedger::new();
        let proposal = Proposal::new(SuggestionKind::Append, "tail", "adds a tail");
        let applied = ledger.record_applied(&proposal, edit(), MessageId(1));

        let accepted = ledger
            .finalize(applied.id, SuggestionState::Accepted, Compensation::NotRequired)
            .expect("entry exists");
        assert_eq!(accepted.state, SuggestionState::Accepted);
        assert!(accepted.resolved_at.is_some());

        let unchanged = ledger
            .finalize(applied.id, SuggestionState::Rejected, Compensation::Undone)
            .expect("entry exists");
        assert_eq!(unchanged.state, SuggestionState::Accepted);
        assert_eq!(unchanged.compensation, Some(Compensation::NotRequired));
        assert_eq!(ledger.transitions().len(), 2);
        assert_eq!(ledger.with_state(SuggestionState::Accepted).count(), 1);
    }

    #[test]
    fn finalize_unknown_id_is_none() {
        let mut ledger = SuggestionLedger::new();
        assert!(ledger
            .finalize(SuggestionId(9), SuggestionState::Accepted, Compensation::NotRequired)
            .is_none());
    }
}
