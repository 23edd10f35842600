//! Conversation log - ordered, append-only chat history.
//!
//! Messages are never reordered or edited after creation. An assistant
//! message that spawned a suggestion carries only the suggestion id; the
//! suggestion itself lives in the ledger.

use chrono::Utc;
use shared_types::{Message, MessageId, Role, SuggestionId};

#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    messages: Vec<Message>,
    composing: bool,
    last_id: u64,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the id the next appended message will receive.
    ///
    /// Lets a suggestion name its originating message before that message
    /// exists.
    pub fn next_id(&self) -> MessageId {
        MessageId(self.last_id + 1)
    }

    pub fn push(
        &mut self,
        role: Role,
        content: impl Into<String>,
        explanation: Option<String>,
        suggestion_id: Option<SuggestionId>,
    ) -> &Message {
        self.last_id += 1;
        self.messages.push(Message {
            id: MessageId(self.last_id),
            role,
            content: content.into(),
            explanation,
            suggestion_id,
            created_at: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::User, content, None, None)
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::Assistant, content, None, None)
    }

    pub fn push_notice(&mut self, content: impl Into<String>) -> &Message {
        self.push(Role::System, content, None, None)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// UI feedback only; has no bearing on suggestion state.
    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn set_composing(&mut self, composing: bool) {
        self.composing = composing;
    }
}
