//! End-to-end session flow through a scripted assistant gateway

use shared_types::{Role, SuggestionKind, SuggestionState};
use writer_assist::{
    AssistConfig, AssistSession, DocumentModel, GatewayError, InMemoryDocument, ScriptedGateway,
    SessionError, TurnOutcome,
};

const INSERT_HELLO: &str =
    r#"{"type":"suggestion","action":"insert","content":"Hello","explanation":"greeting"}"#;

fn session(text: &str) -> AssistSession<InMemoryDocument> {
    AssistSession::with_document(AssistConfig::default(), InMemoryDocument::new(text))
}

#[tokio::test]
async fn test_conversational_reply_is_logged_verbatim() {
    let gateway = ScriptedGateway::with_replies(["Sure, here's some advice..."]);
    let mut session = session("Notes");

    let outcome = session
        .submit(&gateway, "Any tips?")
        .await
        .expect("submit");

    assert!(matches!(outcome, TurnOutcome::Conversational { .. }));
    let roles: Vec<Role> = session.messages().iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant]);
    assert_eq!(session.messages()[1].content, "Sure, here's some advice...");
    assert!(session.ledger().is_empty());
    assert_eq!(session.document().map(|d| d.text()), Some("Notes".to_string()));
}

#[tokio::test]
async fn test_proposal_reply_is_applied_and_linked() {
    let gateway = ScriptedGateway::with_replies([INSERT_HELLO]);
    let mut session = session("");

    let outcome = session.submit(&gateway, "Greet").await.expect("submit");
    let id = outcome.suggestion_id().expect("suggestion");

    let suggestion = session.suggestion(id).expect("entry");
    assert_eq!(suggestion.kind, SuggestionKind::Insert);
    assert_eq!(suggestion.state, SuggestionState::Applied);
    assert_eq!(suggestion.explanation.as_deref(), Some("greeting"));

    let message = session.messages().last().expect("assistant message");
    assert_eq!(message.suggestion_id, Some(id));
    assert_eq!(message.id, suggestion.originating_message_id);
    assert_eq!(session.document().map(|d| d.text()), Some("Hello".to_string()));
}

#[tokio::test]
async fn test_request_carries_document_context() {
    let gateway = ScriptedGateway::with_replies(["ok"]);
    let mut session = AssistSession::with_document(
        AssistConfig::default(),
        InMemoryDocument::new("The quick fox").with_selection(4, 9),
    );

    session.submit(&gateway, "Synonym?").await.expect("submit");

    let requests = gateway.requests().await;
    assert_eq!(requests.len(), 1);
    let context = requests[0].document.as_ref().expect("context");
    assert_eq!(context.text, "The quick fox");
    assert_eq!(context.selection.as_deref(), Some("quick"));
    assert!(!context.truncated);
}

#[tokio::test]
async fn test_gateway_failure_becomes_notice() {
    let gateway = ScriptedGateway::new([Err(GatewayError::Timeout(30_000))]);
    let mut session = session("x");

    let outcome = session.submit(&gateway, "Hi").await.expect("submit");

    assert!(matches!(
        outcome,
        TurnOutcome::Failed {
            error: GatewayError::Timeout(30_000),
            ..
        }
    ));
    assert!(!session.is_composing());
    let last = session.messages().last().expect("notice");
    assert_eq!(last.role, Role::System);
}

#[tokio::test]
async fn test_empty_submit_never_reaches_gateway() {
    let gateway = ScriptedGateway::with_replies(["unused"]);
    let mut session = session("x");

    let err = session.submit(&gateway, "").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidMessage(_)));
    assert!(gateway.requests().await.is_empty());
}

#[test]
fn test_composing_flag_spans_the_request() {
    let mut session = session("x");
    assert!(!session.is_composing());

    let request = session.on_user_submit("hello").expect("submit");
    assert!(session.is_composing());

    session.on_assistant_reply(&request.request_id, "hi");
    assert!(!session.is_composing());
}

#[test]
fn test_late_reply_uses_selection_at_arrival() {
    let mut session = AssistSession::with_document(
        AssistConfig::default(),
        InMemoryDocument::new("first second").with_selection(0, 5),
    );
    let request = session.on_user_submit("rewrite this").expect("submit");

    // the user moves on before the reply lands
    session.document_mut().expect("document").select(6, 12);

    let outcome = session.on_assistant_reply(
        &request.request_id,
        r#"{"type":"suggestion","action":"replace","content":"2nd"}"#,
    );
    assert!(matches!(outcome, TurnOutcome::Suggested { .. }));
    assert_eq!(
        session.document().map(|d| d.text()),
        Some("first 2nd".to_string())
    );
}

#[test]
fn test_reply_for_stale_request_is_still_handled() {
    let mut session = session("");
    let stale = session.on_user_submit("one").expect("submit");
    let current = session.on_user_submit("two").expect("submit");
    assert_ne!(stale.request_id, current.request_id);

    let outcome = session.on_assistant_reply(&stale.request_id, "answer to one");
    assert!(matches!(outcome, TurnOutcome::Conversational { .. }));
    assert!(!session.is_composing());
    assert_eq!(session.messages().len(), 3);
}

#[test]
fn test_not_ready_document_surfaces_notice_without_ledger_entry() {
    let mut doc = InMemoryDocument::new("body");
    doc.set_ready(false);
    let mut session = AssistSession::with_document(AssistConfig::default(), doc);

    let request = session.on_user_submit("append").expect("submit");
    assert!(request.document.is_none());

    let outcome = session.on_assistant_reply(&request.request_id, INSERT_HELLO);
    let TurnOutcome::ApplierUnavailable { message, notice, .. } = outcome else {
        panic!("expected applier unavailable");
    };
    assert_eq!(message.content, "Hello");
    assert_eq!(notice.role, Role::System);
    assert!(session.ledger().is_empty());
    assert_eq!(session.document().map(|d| d.text()), Some("body".to_string()));
}

#[test]
fn test_malformed_payload_degrades_to_conversation() {
    let mut session = session("untouched");
    let request = session.on_user_submit("edit").expect("submit");
    let raw = r#"{"type":"suggestion","action":"rewrite","content":"x"}"#;

    let outcome = session.on_assistant_reply(&request.request_id, raw);
    assert!(matches!(outcome, TurnOutcome::Malformed { .. }));
    assert_eq!(session.messages()[1].content, raw);
    assert!(session.ledger().is_empty());
    assert_eq!(
        session.document().map(|d| d.text()),
        Some("untouched".to_string())
    );
}

#[test]
fn test_boxed_document_session() {
    let mut session: AssistSession = AssistSession::new(AssistConfig::default());
    session.attach_document(Box::new(InMemoryDocument::new("boxed").with_selection(5, 5)));

    let request = session.on_user_submit("go").expect("submit");
    let outcome = session.on_assistant_reply(
        &request.request_id,
        r#"{"type":"suggestion","action":"insert","content":"!"}"#,
    );
    let id = outcome.suggestion_id().expect("suggestion");
    assert_eq!(session.document().map(|d| d.text()), Some("boxed!".to_string()));

    session.on_reject_suggestion(id).expect("reject");
    assert_eq!(session.document().map(|d| d.text()), Some("boxed".to_string()));
}
