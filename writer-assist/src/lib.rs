//! Writer Assist - speculative assistant edits for a live document
//!
//! Assistant replies are classified once. Structured proposals are applied to
//! the user's document immediately and recorded in an append-only ledger;
//! the user then accepts (keep) or rejects (one compensating undo).

pub mod classifier;
pub mod config;
pub mod conversation;
pub mod document;
pub mod gateway;
pub mod replay;
pub mod session;
pub mod suggestions;

pub use classifier::{Classification, ClassifyError, Proposal, ResponseClassifier};
pub use config::{load_config, AssistConfig, ConfigError};
pub use conversation::ConversationLog;
pub use document::{DocumentModel, InMemoryDocument};
pub use gateway::{AssistRequest, AssistantGateway, DocumentContext, GatewayError, ScriptedGateway};
pub use session::{AssistSession, SessionError, TurnOutcome};
pub use suggestions::{
    CompensationPolicy, ReconcileError, ReconciliationController, Resolution, SuggestionLedger,
};
