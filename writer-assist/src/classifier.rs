//! Response classification.
//!
//! Assistant output is classified exactly once, at the boundary, into
//! conversational text, an edit proposal, or a malformed proposal payload.
//! Nothing downstream re-inspects the raw text.

use regex::Regex;
use serde_json::Value;
use shared_types::{SuggestionKind, SUGGESTION_PAYLOAD_TYPE};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::config::ClassifierConfig;

const FENCED_JSON_PATTERN: &str = r"(?s)^```(?:json|JSON)?[ \t]*\r?\n(.*?)\r?\n?```$";

static FENCED_JSON: OnceLock<Option<Regex>> = OnceLock::new();

/// None only if the pattern fails to compile; fenced payloads are then
/// classified as plain text.
fn fenced_json_regex() -> Option<&'static Regex> {
    FENCED_JSON
        .get_or_init(|| match Regex::new(FENCED_JSON_PATTERN) {
            Ok(regex) => Some(regex),
            Err(e) => {
                tracing::error!(error = %e, "Fenced JSON pattern failed to compile");
                None
            }
        })
        .as_ref()
}

/// Structured edit instruction extracted from assistant output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub kind: SuggestionKind,
    pub content: String,
    pub explanation: String,
}

impl Proposal {
    pub fn new(
        kind: SuggestionKind,
        content: impl Into<String>,
        explanation: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            explanation: explanation.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("suggestion payload is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("suggestion payload missing string field `{0}`")]
    MissingField(&'static str),

    #[error("unknown suggestion action: {0}")]
    UnknownAction(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Conversational(String),
    Proposal(Proposal),
    /// Looked like a suggestion payload but could not be used. Shown raw.
    Malformed { raw: String, reason: ClassifyError },
}

#[derive(Debug, Clone, Default)]
pub struct ResponseClassifier {
    config: ClassifierConfig,
}

impl ResponseClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, raw: &str) -> Classification {
        let candidate = self.payload_candidate(raw);
        if !candidate.starts_with('{') {
            return Classification::Conversational(raw.to_string());
        }

        let value: Value = match serde_json::from_str(candidate) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(error = %e, "Assistant output resembled JSON but failed to parse");
                return Classification::Malformed {
                    raw: raw.to_string(),
                    reason: ClassifyError::InvalidJson(e.to_string()),
                };
            }
        };

        let Some(object) = value.as_object() else {
            return Classification::Conversational(raw.to_string());
        };
        if object.get("type").and_then(Value::as_str) != Some(SUGGESTION_PAYLOAD_TYPE) {
            return Classification::Conversational(raw.to_string());
        }

        match Self::proposal_from_object(object) {
            Ok(proposal) => {
                tracing::debug!(
                    kind = %proposal.kind,
                    content_chars = proposal.content.chars().count(),
                    "Classified assistant output as edit proposal"
                );
                Classification::Proposal(proposal)
            }
            Err(reason) => Classification::Malformed {
                raw: raw.to_string(),
                reason,
            },
        }
    }

    fn payload_candidate<'a>(&self, raw: &'a str) -> &'a str {
        let trimmed = raw.trim();
        if self.config.unwrap_fenced_json {
            if let Some(inner) = fenced_json_regex()
                .and_then(|regex| regex.captures(trimmed))
                .and_then(|caps| caps.get(1))
            {
                return inner.as_str().trim();
            }
        }
        trimmed
    }

    fn proposal_from_object(
        object: &serde_json::Map<String, Value>,
    ) -> Result<Proposal, ClassifyError> {
        let action = object
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ClassifyError::MissingField("action"))?;
        let content = object
            .get("content")
            .and_then(Value::as_str)
            .ok_or(ClassifyError::MissingField("content"))?;
        let kind = SuggestionKind::from_str(action.trim())
            .map_err(|_| ClassifyError::UnknownAction(action.to_string()))?;
        let explanation = object
            .get("explanation")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(Proposal::new(kind, content, explanation))
    }
}
