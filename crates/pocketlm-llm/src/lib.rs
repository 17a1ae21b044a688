//! Inference session lifecycle for locally hosted, quantized chat models.
//!
//! Owns at most one live engine handle at a time and provides:
//! - Model load/unload with conversation history replay
//! - Single-flight, cancellable streaming generation with partial output
//! - Context-usage tracking against the engine's context window
//!
//! The native engine itself (tokenization, sampling, KV cache) is an
//! external collaborator reached through the narrow [`engine`] contract.

pub mod engine;
pub mod session;
pub mod transform;

pub use engine::{EngineError, EngineLoader, EngineParams, Fragment, InferenceEngine};
pub use session::{
    CancelToken, GenerationOutcome, GenerationResult, LoadState, SessionConfig, SessionManager,
};
pub use transform::rewrite_reasoning;

use pocketlm_common::ChatId;

/// Who produced a conversation turn.
///
/// These are exactly the three roles the engine accepts for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

/// Durable record of a chat's turns.
///
/// The session manager reads turns to replay them into a freshly loaded
/// session, and appends the final assistant turn after a successful
/// generation. Persistence of everything else lives with the caller.
pub trait ConversationStore: Send + Sync {
    /// Returns all stored turns for the chat, in chronological order.
    fn turns_for(&self, chat: &ChatId) -> Result<Vec<ChatTurn>, LlmError>;

    /// Appends a completed assistant response to the chat.
    fn append_assistant_turn(&self, chat: &ChatId, text: &str) -> Result<(), LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// The engine could not produce a handle. Terminal for that load
    /// attempt; no resources are retained.
    #[error("model load failed: {0}")]
    LoadFailed(String),

    /// `generate` was called without a ready session. A programming
    /// error on the caller's side, never queued or retried.
    #[error("no model is loaded")]
    NotReady,

    /// The engine reported a mid-stream error. The session stays loaded
    /// and the caller may retry; partial text is discarded.
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// A load or unload was requested while a generation is driving the
    /// engine. Cancel the generation first.
    #[error("a generation is already in progress")]
    GenerationActive,

    #[error("conversation store error: {0}")]
    Store(String),
}
