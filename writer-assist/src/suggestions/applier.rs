//! Optimistic application of proposals to the live document.

use shared_types::{
    ApplyMode, MessageId, Suggestion, SuggestionKind, TextRange, EVENT_SUGGESTION_APPLIED,
};

use super::SuggestionLedger;
use crate::classifier::Proposal;
use crate::document::{fingerprint, DocumentModel};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("document unavailable: {0}")]
    Unavailable(String),
}

/// What a single apply did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub applied_as: ApplyMode,
    pub range: TextRange,
    pub replaced_text: Option<String>,
    pub before_fingerprint: String,
    pub after_fingerprint: String,
}

/// Apply `proposal` to the document and record it in the ledger.
///
/// The document's current cursor/selection is used, whatever the user did
/// since the request was sent. On `Err` nothing was written and no ledger
/// entry exists.
pub fn apply_proposal(
    proposal: &Proposal,
    document: Option<&mut dyn DocumentModel>,
    ledger: &mut SuggestionLedger,
    originating_message_id: MessageId,
) -> Result<Suggestion, ApplyError> {
    let document = document.ok_or_else(|| ApplyError::Unavailable("no document attached".into()))?;
    if !document.is_ready() {
        return Err(ApplyError::Unavailable("document not ready".into()));
    }

    let edit = write_proposal(proposal, document);
    let suggestion = ledger.record_applied(proposal, edit, originating_message_id);
    tracing::info!(
        event_type = EVENT_SUGGESTION_APPLIED,
        suggestion_id = %suggestion.id,
        kind = %suggestion.kind,
        applied_as = %suggestion.applied_as,
        start = suggestion.range.start,
        end = suggestion.range.end,
        "Suggestion applied"
    );
    Ok(suggestion)
}

/// Exactly one mutating adapter call per branch.
fn write_proposal(proposal: &Proposal, document: &mut dyn DocumentModel) -> AppliedEdit {
    let before_text = document.text();
    let before_fingerprint = fingerprint(&before_text);
    let content_chars = proposal.content.chars().count();

    let (applied_as, range, replaced_text) = match proposal.kind {
        SuggestionKind::Replace if document.has_selection() => {
            let selection = document.selection();
            let replaced = document.selected_text();
            document.replace_selection(&proposal.content);
            (
                ApplyMode::ReplacedSelection,
                TextRange::new(selection.start, selection.start + content_chars),
                Some(replaced),
            )
        }
        SuggestionKind::Replace | SuggestionKind::Insert => {
            if proposal.kind == SuggestionKind::Replace {
                tracing::debug!("Replace without a selection; inserting at cursor");
            }
            let cursor = document.selection().end;
            document.insert_at_cursor(&proposal.content);
            (
                ApplyMode::InsertedAtCursor,
                TextRange::new(cursor, cursor + content_chars),
                None,
            )
        }
        SuggestionKind::Append => {
            let previous = document.selection();
            let end = document.move_to_end();
            let separator = if before_text.is_empty() || before_text.ends_with('\n') {
                ""
            } else {
                "\n"
            };
            let block = format!("{separator}{}", proposal.content);
            // The history entry must carry the user's selection, not the end caret.
            document.set_selection(previous);
            document.insert_at_position(end, &block);
            document.set_selection(previous);
            let start = end + separator.len();
            (
                ApplyMode::AppendedAtEnd,
                TextRange::new(start, start + content_chars),
                None,
            )
        }
    };

    AppliedEdit {
        applied_as,
        range,
        replaced_text,
        before_fingerprint,
        after_fingerprint: fingerprint(&document.text()),
    }
}
