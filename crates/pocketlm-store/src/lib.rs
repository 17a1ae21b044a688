//! Durable entity storage for pocketlm: chats, their messages, downloaded
//! model artifacts, and task presets, backed by a single JSON file.
//!
//! Implements [`pocketlm_llm::ConversationStore`] so the session manager
//! can replay history out of it and persist generated responses into it.

pub mod store;
pub mod types;

pub use store::{ChatStore, StoreError};
pub use types::{Chat, ChatMessage, ModelRecord, Task};
