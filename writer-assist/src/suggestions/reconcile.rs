//! Reconciliation of applied suggestions.
//!
//! The transition (`Applied -> Accepted | Rejected`) and the document-side
//! compensation are kept apart: [`compensate`] only talks to the document,
//! [`ReconciliationController`] only moves ledger state.

use serde::{Deserialize, Serialize};
use shared_types::{
    Compensation, Suggestion, SuggestionId, SuggestionState, EVENT_SUGGESTION_ACCEPTED,
    EVENT_SUGGESTION_REJECTED,
};

use super::SuggestionLedger;
use crate::document::{fingerprint, DocumentModel};

/// How a rejection reverts the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompensationPolicy {
    /// One undo, then verify the pre-apply text is back; redo if it is not.
    #[default]
    Guarded,
    /// One undo, unverified.
    UndoStack,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("Suggestion not found: {0}")]
    SuggestionNotFound(SuggestionId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(Suggestion),
    /// Already accepted or rejected; nothing changed.
    AlreadyTerminal(Suggestion),
}

impl Resolution {
    pub fn suggestion(&self) -> &Suggestion {
        match self {
            Resolution::Resolved(s) | Resolution::AlreadyTerminal(s) => s,
        }
    }

    pub fn state(&self) -> SuggestionState {
        self.suggestion().state
    }
}

/// Revert an applied suggestion with exactly one undo.
pub fn compensate(
    policy: CompensationPolicy,
    suggestion: &Suggestion,
    document: Option<&mut dyn DocumentModel>,
) -> Compensation {
    let Some(document) = document.filter(|doc| doc.is_ready()) else {
        tracing::warn!(
            suggestion_id = %suggestion.id,
            "No ready document to compensate against"
        );
        return Compensation::UndoUnavailable;
    };

    let drifted = fingerprint(&document.text()) != suggestion.after_fingerprint;
    if !document.undo_last_operation() {
        tracing::warn!(
            suggestion_id = %suggestion.id,
            drifted,
            "Undo history empty; recording rejection without compensation"
        );
        return Compensation::UndoUnavailable;
    }

    match policy {
        CompensationPolicy::UndoStack => Compensation::Undone,
        CompensationPolicy::Guarded => {
            if fingerprint(&document.text()) == suggestion.before_fingerprint {
                Compensation::Undone
            } else {
                let redone = document.redo_last_operation();
                tracing::warn!(
                    suggestion_id = %suggestion.id,
                    drifted,
                    redone,
                    "Undo did not restore pre-apply text; reverted the undo"
                );
                Compensation::Diverged
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconciliationController {
    policy: CompensationPolicy,
}

impl ReconciliationController {
    pub fn new(policy: CompensationPolicy) -> Self {
        Self { policy }
    }

    /// Mark Accepted. Never touches the document.
    pub fn accept(
        &self,
        ledger: &mut SuggestionLedger,
        id: SuggestionId,
    ) -> Result<Resolution, ReconcileError> {
        if let Some(done) = Self::terminal(ledger, id)? {
            return Ok(done);
        }
        let resolved = ledger
            .finalize(id, SuggestionState::Accepted, Compensation::NotRequired)
            .ok_or(ReconcileError::SuggestionNotFound(id))?;
        tracing::info!(
            event_type = EVENT_SUGGESTION_ACCEPTED,
            suggestion_id = %id,
            "Suggestion accepted"
        );
        Ok(Resolution::Resolved(resolved))
    }

    /// Compensate once, then mark Rejected. An empty undo history still rejects.
    pub fn reject(
        &self,
        ledger: &mut SuggestionLedger,
        document: Option<&mut dyn DocumentModel>,
        id: SuggestionId,
    ) -> Result<Resolution, ReconcileError> {
        if let Some(done) = Self::terminal(ledger, id)? {
            return Ok(done);
        }
        let applied = ledger
            .get(id)
            .cloned()
            .ok_or(ReconcileError::SuggestionNotFound(id))?;

        let compensation = compensate(self.policy, &applied, document);
        let resolved = ledger
            .finalize(id, SuggestionState::Rejected, compensation)
            .ok_or(ReconcileError::SuggestionNotFound(id))?;
        tracing::info!(
            event_type = EVENT_SUGGESTION_REJECTED,
            suggestion_id = %id,
            compensation = %compensation,
            "Suggestion rejected"
        );
        Ok(Resolution::Resolved(resolved))
    }

    fn terminal(
        ledger: &SuggestionLedger,
        id: SuggestionId,
    ) -> Result<Option<Resolution>, ReconcileError> {
        let entry = ledger
            .get(id)
            .ok_or(ReconcileError::SuggestionNotFound(id))?;
        if entry.state.is_terminal() {
            tracing::debug!(
                suggestion_id = %id,
                state = %entry.state,
                "Ignoring resolution of terminal suggestion"
            );
            return Ok(Some(Resolution::AlreadyTerminal(entry.clone())));
        }
        Ok(None)
    }
}
