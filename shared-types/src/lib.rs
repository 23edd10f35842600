//! Shared types between the suggestion engine and its UI surface
//!
//! These types are used by both:
//! - the `writer-assist` engine (native Rust)
//! - a chat/editor UI (TypeScript bindings generated with ts-rs)
//!
//! Serializable with serde for JSON snapshots and events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};
use ts_rs::TS;

// ============================================================================
// Identifiers
// ============================================================================

/// Conversation message identifier, allocated monotonically by the log
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, TS,
)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Suggestion identifier, allocated monotonically by the ledger
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, TS,
)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct SuggestionId(pub u64);

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Conversation
// ============================================================================

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, AsRefStr, TS,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub enum Role {
    User,
    Assistant,
    /// Engine notices (unavailable adapter, failed request, unknown suggestion)
    System,
}

/// Chat message for UI display
///
/// A message only references its suggestion by id; suggestion state lives in
/// the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub explanation: Option<String>,
    pub suggestion_id: Option<SuggestionId>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Suggestions
// ============================================================================

/// Edit action declared by the assistant
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    AsRefStr,
    TS,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub enum SuggestionKind {
    Replace,
    Insert,
    Append,
}

/// Lifecycle state. `Applied` moves once to `Accepted` or `Rejected`.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, AsRefStr, TS,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub enum SuggestionState {
    Applied,
    Accepted,
    Rejected,
}

impl SuggestionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SuggestionState::Accepted | SuggestionState::Rejected)
    }
}

/// How the applier actually wrote the content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, TS)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub enum ApplyMode {
    ReplacedSelection,
    /// Also used when a replace had no selection to overwrite
    InsertedAtCursor,
    AppendedAtEnd,
}

/// Document-side outcome of resolving a suggestion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, TS)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub enum Compensation {
    /// Accepted: content stays live.
    NotRequired,
    /// One undo reverted the suggestion.
    Undone,
    /// The undo history was empty, or no document was attached.
    UndoUnavailable,
    /// The undo did not restore the pre-apply text and was redone.
    Diverged,
}

/// Half-open char range `[start, end)`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn caret(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Speculatively applied edit, owned by the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct Suggestion {
    pub id: SuggestionId,
    pub kind: SuggestionKind,
    pub content: String,
    pub explanation: Option<String>,
    pub state: SuggestionState,
    pub applied_as: ApplyMode,
    /// Where the content landed at apply time
    pub range: TextRange,
    /// Text overwritten by a replace (audit only)
    pub replaced_text: Option<String>,
    pub before_fingerprint: String,
    pub after_fingerprint: String,
    pub compensation: Option<Compensation>,
    pub applied_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub originating_message_id: MessageId,
}

/// One append-only ledger record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct LedgerTransition {
    pub suggestion_id: SuggestionId,
    pub from: Option<SuggestionState>,
    pub to: SuggestionState,
    pub at: DateTime<Utc>,
}

// ============================================================================
// UI State
// ============================================================================

/// Everything the UI renders for one session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, TS)]
#[ts(export, export_to = "../../bindings/writer-assist.ts")]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub suggestions: Vec<Suggestion>,
    pub transitions: Vec<LedgerTransition>,
    pub composing: bool,
}

// ============================================================================
// Constants
// ============================================================================

/// Tag value the assistant uses for structured edit payloads
pub const SUGGESTION_PAYLOAD_TYPE: &str = "suggestion";

/// Event types
pub const EVENT_CHAT_USER_MSG: &str = "chat.user_msg";
pub const EVENT_CHAT_ASSISTANT_MSG: &str = "chat.assistant_msg";
pub const EVENT_SUGGESTION_APPLIED: &str = "suggestion.applied";
pub const EVENT_SUGGESTION_ACCEPTED: &str = "suggestion.accepted";
pub const EVENT_SUGGESTION_REJECTED: &str = "suggestion.rejected";

// ============================================================================
// Tests
// ============================================================================
