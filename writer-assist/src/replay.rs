//! Scripted session replays against an in-memory document.
//!
//! A script models one user at one editor: submits, assistant replies or
//! failures, accept/reject clicks, and the user's own selection moves,
//! typing and native undo/redo in between.

use serde::{Deserialize, Serialize};
use shared_types::{SessionSnapshot, SuggestionId};
use std::path::{Path, PathBuf};

use crate::config::AssistConfig;
use crate::document::{DocumentModel, InMemoryDocument};
use crate::gateway::GatewayError;
use crate::session::AssistSession;

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read replay script {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse replay script: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplaySelection {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplayScript {
    #[serde(default)]
    pub initial_text: String,
    #[serde(default)]
    pub selection: Option<ReplaySelection>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ReplayStep {
    Submit { text: String },
    Reply { raw: String },
    Fail { error: String },
    Accept { id: u64 },
    Reject { id: u64 },
    Select { start: usize, end: usize },
    Type { text: String },
    Undo,
    Redo,
    Detach,
    Attach,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplayOutcome {
    pub snapshot: SessionSnapshot,
    /// None when the script ended with the document detached.
    pub document_text: Option<String>,
}

impl ReplayScript {
    pub fn from_json(raw: &str) -> Result<Self, ReplayError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ReplayError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ReplayError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

/// Run every step in order. Step-level failures are logged and skipped;
/// the session surfaces them as notices where it would in a live UI.
pub fn run_script(script: &ReplayScript, config: AssistConfig) -> ReplayOutcome {
    let mut document = InMemoryDocument::new(&script.initial_text);
    if let Some(selection) = &script.selection {
        document = document.with_selection(selection.start, selection.end);
    }

    let mut session = AssistSession::with_document(config, document);
    let mut parked: Option<InMemoryDocument> = None;
    let mut last_request: Option<String> = None;

    for (index, step) in script.steps.iter().enumerate() {
        tracing::debug!(index, step = ?step, "Replaying step");
        match step {
            ReplayStep::Submit { text } => match session.on_user_submit(text) {
                Ok(request) => last_request = Some(request.request_id),
                Err(e) => tracing::warn!(index, error = %e, "Submit rejected"),
            },
            ReplayStep::Reply { raw } => {
                let request_id = last_request.as_deref().unwrap_or("unsolicited");
                session.on_assistant_reply(request_id, raw);
            }
            ReplayStep::Fail { error } => {
                let request_id = last_request.as_deref().unwrap_or("unsolicited");
                session.on_assistant_failure(request_id, GatewayError::Transport(error.clone()));
            }
            ReplayStep::Accept { id } => {
                if let Err(e) = session.on_accept_suggestion(SuggestionId(*id)) {
                    tracing::warn!(index, error = %e, "Accept failed");
                }
            }
            ReplayStep::Reject { id } => {
                if let Err(e) = session.on_reject_suggestion(SuggestionId(*id)) {
                    tracing::warn!(index, error = %e, "Reject failed");
                }
            }
            ReplayStep::Select { start, end } => {
                with_document(&mut session, index, |doc| doc.select(*start, *end));
            }
            ReplayStep::Type { text } => {
                with_document(&mut session, index, |doc| doc.type_text(text));
            }
            ReplayStep::Undo => {
                with_document(&mut session, index, |doc| {
                    doc.undo_last_operation();
                });
            }
            ReplayStep::Redo => {
                with_document(&mut session, index, |doc| {
                    doc.redo_last_operation();
                });
            }
            ReplayStep::Detach => {
                if let Some(doc) = session.detach_document() {
                    parked = Some(doc);
                }
            }
            ReplayStep::Attach => match parked.take() {
                Some(doc) => session.attach_document(doc),
                None => tracing::warn!(index, "Attach step with no detached document"),
            },
        }
    }

    ReplayOutcome {
        snapshot: session.snapshot(),
        document_text: session.document().map(|doc| doc.text()),
    }
}

fn with_document<F>(session: &mut AssistSession<InMemoryDocument>, index: usize, edit: F)
where
    F: FnOnce(&mut InMemoryDocument),
{
    match session.document_mut() {
        Some(doc) => edit(doc),
        None => tracing::warn!(index, "Document step while detached; skipped"),
    }
}
