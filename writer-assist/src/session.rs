//! AssistSession - explicit per-document context for assistant edits.
//!
//! Owns the conversation log, the suggestion ledger, the reconciliation
//! policy and (optionally) the document adapter. There is no ambient
//! state: every UI event goes through a method on the session.
//!
//! Flow:
//! 1. `on_user_submit` records the user message and returns the request
//! 2. the gateway answers (or fails) outside the session
//! 3. `on_assistant_reply` classifies once and applies proposals immediately
//! 4. `on_accept_suggestion` / `on_reject_suggestion` finalize the ledger

use chrono::Utc;
use shared_types::{
    Compensation, Message, Role, SessionSnapshot, Suggestion, SuggestionId, SuggestionState,
    EVENT_CHAT_ASSISTANT_MSG, EVENT_CHAT_USER_MSG,
};

use crate::classifier::{Classification, ClassifyError, ResponseClassifier};
use crate::config::AssistConfig;
use crate::conversation::ConversationLog;
use crate::document::DocumentModel;
use crate::gateway::{AssistRequest, AssistantGateway, DocumentContext, GatewayError};
use crate::suggestions::{
    apply_proposal, ApplyError, ReconcileError, ReconciliationController, Resolution,
    SuggestionLedger,
};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Result of handling one assistant reply or failure
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Conversational {
        message: Message,
    },
    Suggested {
        message: Message,
        suggestion: Suggestion,
    },
    /// Proposal could not be applied; shown as text plus a notice.
    ApplierUnavailable {
        message: Message,
        notice: Message,
        error: ApplyError,
    },
    /// Broken suggestion payload; the raw reply is shown as conversation.
    Malformed {
        message: Message,
        reason: ClassifyError,
    },
    Failed {
        notice: Message,
        error: GatewayError,
    },
}

impl TurnOutcome {
    pub fn suggestion_id(&self) -> Option<SuggestionId> {
        match self {
            TurnOutcome::Suggested { suggestion, .. } => Some(suggestion.id),
            _ => None,
        }
    }
}

pub struct AssistSession<D = Box<dyn DocumentModel>> {
    config: AssistConfig,
    classifier: ResponseClassifier,
    controller: ReconciliationController,
    conversation: ConversationLog,
    ledger: SuggestionLedger,
    document: Option<D>,
    outstanding: Option<String>,
}

impl<D: DocumentModel> AssistSession<D> {
    pub fn new(config: AssistConfig) -> Self {
        Self {
            classifier: ResponseClassifier::new(config.classifier.clone()),
            controller: ReconciliationController::new(config.compensation_policy),
            config,
            conversation: ConversationLog::new(),
            ledger: SuggestionLedger::new(),
            document: None,
            outstanding: None,
        }
    }

    pub fn with_document(config: AssistConfig, document: D) -> Self {
        let mut session = Self::new(config);
        session.attach_document(document);
        session
    }

    // ------------------------------------------------------------------
    // Document attachment
    // ------------------------------------------------------------------

    pub fn attach_document(&mut self, document: D) {
        if self.document.is_some() {
            tracing::debug!("Replacing attached document");
        }
        self.document = Some(document);
    }

    pub fn detach_document(&mut self) -> Option<D> {
        self.document.take()
    }

    pub fn document(&self) -> Option<&D> {
        self.document.as_ref()
    }

    /// The user's side of the document; edits here are not tracked.
    pub fn document_mut(&mut self) -> Option<&mut D> {
        self.document.as_mut()
    }

    // ------------------------------------------------------------------
    // UI events
    // ------------------------------------------------------------------

    pub fn on_user_submit(&mut self, text: &str) -> Result<AssistRequest, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::InvalidMessage(
                "Message cannot be empty".to_string(),
            ));
        }
        let max_chars = self.config.conversation.max_message_chars;
        if text.chars().count() > max_chars {
            return Err(SessionError::InvalidMessage(format!(
                "Message exceeds {max_chars} characters"
            )));
        }

        if let Some(previous) = self.outstanding.as_deref() {
            tracing::debug!(
                request_id = %previous,
                "New request dispatched while another is outstanding"
            );
        }

        self.conversation.push_user(text);
        self.conversation.set_composing(true);

        let request = AssistRequest {
            request_id: ulid::Ulid::new().to_string(),
            user_text: text.to_string(),
            document: self.document_context(),
            sent_at: Utc::now(),
        };
        self.outstanding = Some(request.request_id.clone());
        tracing::info!(
            event_type = EVENT_CHAT_USER_MSG,
            request_id = %request.request_id,
            has_document = request.document.is_some(),
            "Dispatching assistant request"
        );
        Ok(request)
    }

    /// Classify and, for proposals, apply against the selection as it is now.
    pub fn on_assistant_reply(&mut self, request_id: &str, raw: &str) -> TurnOutcome {
        self.settle_request(request_id);
        tracing::debug!(
            event_type = EVENT_CHAT_ASSISTANT_MSG,
            request_id = %request_id,
            reply_len = raw.len(),
            "Assistant reply received"
        );

        match self.classifier.classify(raw) {
            Classification::Conversational(text) => TurnOutcome::Conversational {
                message: self.conversation.push_assistant(text).clone(),
            },
            Classification::Malformed { raw, reason } => {
                tracing::warn!(
                    request_id = %request_id,
                    error = %reason,
                    "Malformed suggestion payload; showing raw reply"
                );
                TurnOutcome::Malformed {
                    message: self.conversation.push_assistant(raw).clone(),
                    reason,
                }
            }
            Classification::Proposal(proposal) => {
                let message_id = self.conversation.next_id();
                let explanation =
                    Some(proposal.explanation.clone()).filter(|text| !text.is_empty());
                let document = self
                    .document
                    .as_mut()
                    .map(|doc| doc as &mut dyn DocumentModel);

                match apply_proposal(&proposal, document, &mut self.ledger, message_id) {
                    Ok(suggestion) => {
                        let message = self
                            .conversation
                            .push(
                                Role::Assistant,
                                proposal.content.clone(),
                                explanation,
                                Some(suggestion.id),
                            )
                            .clone();
                        TurnOutcome::Suggested {
                            message,
                            suggestion,
                        }
                    }
                    Err(error) => {
                        tracing::warn!(
                            request_id = %request_id,
                            error = %error,
                            "Could not apply suggestion"
                        );
                        let message = self
                            .conversation
                            .push(Role::Assistant, proposal.content.clone(), explanation, None)
                            .clone();
                        let notice = self
                            .conversation
                            .push_notice(format!(
                                "The suggested {} could not be applied ({error}). The text is shown above.",
                                proposal.kind
                            ))
                            .clone();
                        TurnOutcome::ApplierUnavailable {
                            message,
                            notice,
                            error,
                        }
                    }
                }
            }
        }
    }

    /// Timeouts and transport errors end the turn with a notice.
    pub fn on_assistant_failure(&mut self, request_id: &str, error: GatewayError) -> TurnOutcome {
        self.settle_request(request_id);
        tracing::warn!(request_id = %request_id, error = %error, "Assistant request failed");
        let notice = self
            .conversation
            .push_notice(format!("The assistant could not respond: {error}"))
            .clone();
        TurnOutcome::Failed { notice, error }
    }

    pub fn on_accept_suggestion(&mut self, id: SuggestionId) -> Result<Resolution, SessionError> {
        let result = self.controller.accept(&mut self.ledger, id);
        self.surface_reconcile_error(result)
    }

    pub fn on_reject_suggestion(&mut self, id: SuggestionId) -> Result<Resolution, SessionError> {
        let document = self
            .document
            .as_mut()
            .map(|doc| doc as &mut dyn DocumentModel);
        let result = self.controller.reject(&mut self.ledger, document, id);
        let resolution = self.surface_reconcile_error(result)?;
        if let Resolution::Resolved(suggestion) = &resolution {
            self.notify_uncompensated(suggestion);
        }
        Ok(resolution)
    }

    /// Submit, await the gateway, and settle the turn.
    pub async fn submit(
        &mut self,
        gateway: &dyn AssistantGateway,
        text: &str,
    ) -> Result<TurnOutcome, SessionError> {
        let request = self.on_user_submit(text)?;
        let outcome = match gateway.reply(&request).await {
            Ok(raw) => self.on_assistant_reply(&request.request_id, &raw),
            Err(error) => self.on_assistant_failure(&request.request_id, error),
        };
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Exposed state
    // ------------------------------------------------------------------

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn is_composing(&self) -> bool {
        self.conversation.is_composing()
    }

    pub fn suggestion(&self, id: SuggestionId) -> Option<&Suggestion> {
        self.ledger.get(id)
    }

    pub fn suggestion_state(&self, id: SuggestionId) -> Option<SuggestionState> {
        self.ledger.state_of(id)
    }

    pub fn ledger(&self) -> &SuggestionLedger {
        &self.ledger
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            messages: self.conversation.messages().to_vec(),
            suggestions: self.ledger.entries().to_vec(),
            transitions: self.ledger.transitions().to_vec(),
            composing: self.conversation.is_composing(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn settle_request(&mut self, request_id: &str) {
        self.conversation.set_composing(false);
        if self.outstanding.as_deref() == Some(request_id) {
            self.outstanding = None;
        } else {
            tracing::warn!(
                request_id = %request_id,
                outstanding = ?self.outstanding,
                "Reply does not match the outstanding request; handling it anyway"
            );
        }
    }

    fn surface_reconcile_error(
        &mut self,
        result: Result<Resolution, ReconcileError>,
    ) -> Result<Resolution, SessionError> {
        result.map_err(|error| {
            tracing::warn!(error = %error, "Reconciliation failed");
            self.conversation
                .push_notice(format!("That suggestion is no longer available: {error}"));
            SessionError::from(error)
        })
    }

    /// A guarded rejection that found the document changed leaves the text live.
    fn notify_uncompensated(&mut self, suggestion: &Suggestion) {
        if suggestion.compensation != Some(Compensation::Diverged) {
            return;
        }
        self.conversation.push_notice(format!(
            "Suggestion {} was rejected, but the document changed after it was applied, \
             so its text was left in place. Remove it by hand if needed.",
            suggestion.id
        ));
    }

    fn document_context(&self) -> Option<DocumentContext> {
        let document = self.document.as_ref().filter(|doc| doc.is_ready())?;
        let text = document.text();
        let limit = self.config.context.max_context_chars;
        let truncated = text.chars().count() > limit;
        let text = if truncated {
            text.chars().take(limit).collect()
        } else {
            text
        };
        let selection = Some(document.selected_text()).filter(|_| document.has_selection());

        Some(DocumentContext {
            text,
            selection,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::InMemoryDocument;

    fn session(text: &str) -> AssistSession<InMemoryDocument> {
        AssistSession::with_document(AssistConfig::default(), InMemoryDocument::new(text))
    }

    #[test]
    fn submit_sets_composing_and_reply_clears_it() {
        let mut session = session("Body");
        let request = session.on_user_submit("Make it punchier").expect("submit");
        assert!(session.is_composing());
        assert_eq!(
            request.document.as_ref().map(|ctx| ctx.text.as_str()),
            Some("Body")
        );

        let outcome = session.on_assistant_reply(&request.request_id, "Try shorter verbs.");
        assert!(matches!(outcome, TurnOutcome::Conversational { .. }));
        assert!(!session.is_composing());
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn empty_submit_is_rejected_without_state_change() {
        let mut session = session("");
        let err = session.on_user_submit("   ").unwrap_err();
        assert!(matches!(err, SessionError::InvalidMessage(_)));
        assert!(session.messages().is_empty());
        assert!(!session.is_composing());
    }

    #[test]
    fn oversized_submit_is_rejected() {
        let mut config = AssistConfig::default();
        config.conversation.max_message_chars = 4;
        let mut session: AssistSession<InMemoryDocument> = AssistSession::new(config);
        assert!(matches!(
            session.on_user_submit("hello"),
            Err(SessionError::InvalidMessage(_))
        ));
    }

    #[test]
    fn context_is_truncated_and_carries_selection() {
        let mut config = AssistConfig::default();
        config.context.max_context_chars = 5;
        let mut session = AssistSession::with_document(
            config,
            InMemoryDocument::new("abcdefghij").with_selection(1, 3),
        );
        let request = session.on_user_submit("?").expect("submit");
        let ctx = request.document.expect("context");
        assert_eq!(ctx.text, "abcde");
        assert!(ctx.truncated);
        assert_eq!(ctx.selection.as_deref(), Some("bc"));
    }

    #[test]
    fn proposal_message_references_suggestion_by_id() {
        let mut session = session("Hello");
        let request = session.on_user_submit("add a name").expect("submit");
        session
            .document_mut()
            .expect("document")
            .select(5, 5);
        let outcome = session.on_assistant_reply(
            &request.request_id,
            r#"{"type":"suggestion","action":"insert","content":", Ada","explanation":"names help"}"#,
        );

        let TurnOutcome::Suggested {
            message,
            suggestion,
        } = outcome
        else {
            panic!("expected suggestion");
        };
        assert_eq!(message.suggestion_id, Some(suggestion.id));
        assert_eq!(suggestion.originating_message_id, message.id);
        assert_eq!(message.explanation.as_deref(), Some("names help"));
        assert_eq!(
            session.document().map(|doc| doc.text()),
            Some("Hello, Ada".to_string())
        );
    }

    #[test]
    fn malformed_payload_is_shown_raw() {
        let mut session = session("x");
        let request = session.on_user_submit("edit").expect("submit");
        let raw = r#"{"type":"suggestion","content":"no action"}"#;
        let outcome = session.on_assistant_reply(&request.request_id, raw);

        let TurnOutcome::Malformed { message, .. } = outcome else {
            panic!("expected malformed");
        };
        assert_eq!(message.content, raw);
        assert_eq!(message.role, Role::Assistant);
        assert!(session.ledger().is_empty());
        assert_eq!(session.document().map(|doc| doc.text()), Some("x".to_string()));
    }

    #[test]
    fn detached_document_surfaces_notice_and_no_ledger_entry() {
        let mut session = session("x");
        session.detach_document();
        let request = session.on_user_submit("append").expect("submit");
        let outcome = session.on_assistant_reply(
            &request.request_id,
            r##"{"type":"suggestion","action":"append","content":"# Tail"}"##,
        );

        let TurnOutcome::ApplierUnavailable { message, notice, .. } = outcome else {
            panic!("expected applier unavailable");
        };
        assert_eq!(message.suggestion_id, None);
        assert_eq!(notice.role, Role::System);
        assert!(session.ledger().is_empty());
        assert!(!session.is_composing());
    }

    #[test]
    fn failure_clears_composing_with_notice() {
        let mut session = session("x");
        let request = session.on_user_submit("hi").expect("submit");
        let outcome = session.on_assistant_failure(&request.request_id, GatewayError::Timeout(5));
        assert!(matches!(outcome, TurnOutcome::Failed { .. }));
        assert!(!session.is_composing());
        assert_eq!(session.messages().last().map(|m| m.role), Some(Role::System));
    }

    #[test]
    fn unknown_suggestion_resolution_adds_notice() {
        let mut session = session("x");
        let err = session.on_accept_suggestion(SuggestionId(42)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Reconcile(ReconcileError::SuggestionNotFound(_))
        ));
        assert_eq!(session.messages().len(), 1);
        assert_eq!(session.messages()[0].role, Role::System);
    }

    #[test]
    fn snapshot_reflects_ledger_and_messages() {
        let mut session = session("");
        let request = session.on_user_submit("start").expect("submit");
        let outcome = session.on_assistant_reply(
            &request.request_id,
            r##"{"type":"suggestion","action":"append","content":"# Start"}"##,
        );
        let id = outcome.suggestion_id().expect("suggestion");
        let resolution = session.on_reject_suggestion(id).expect("reject");
        assert_eq!(resolution.suggestion().compensation, Some(Compensation::Undone));

        let snapshot = session.snapshot();
        assert_eq!(snapshot.messages.len(), 2);
        assert_eq!(snapshot.suggestions.len(), 1);
        assert_eq!(snapshot.suggestions[0].state, SuggestionState::Rejected);
        assert_eq!(snapshot.transitions.len(), 2);
        assert!(!snapshot.composing);
    }
}
