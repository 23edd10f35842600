//! Assistant gateway boundary.
//!
//! Transport, auth, timeouts and retries belong to the gateway
//! implementation. The engine only sees a reply string or a `GatewayError`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Document state sent alongside the user's text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentContext {
    pub text: String,
    pub selection: Option<String>,
    /// True when `text` was cut to the configured limit.
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistRequest {
    pub request_id: String,
    pub user_text: String,
    pub document: Option<DocumentContext>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("no scripted reply left")]
    Exhausted,
}

#[async_trait]
pub trait AssistantGateway: Send + Sync {
    async fn reply(&self, request: &AssistRequest) -> Result<String, GatewayError>;
}

/// Returns queued replies in order. Used by tests and replays.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<String, GatewayError>>>,
    seen: Mutex<Vec<AssistRequest>>,
}

impl ScriptedGateway {
    pub fn new<I>(replies: I) -> Self
    where
        I: IntoIterator<Item = Result<String, GatewayError>>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(replies.into_iter().map(|reply| Ok(reply.into())))
    }

    pub async fn push(&self, reply: Result<String, GatewayError>) {
        self.replies.lock().await.push_back(reply);
    }

    /// Requests received so far, oldest first.
    pub async fn requests(&self) -> Vec<AssistRequest> {
        self.seen.lock().await.clone()
    }
}

#[async_trait]
impl AssistantGateway for ScriptedGateway {
    async fn reply(&self, request: &AssistRequest) -> Result<String, GatewayError> {
        self.seen.lock().await.push(request.clone());
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(GatewayError::Exhausted))
    }
}
