//! Entity records for chats, messages, models, and task presets.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pocketlm_common::{ChatId, MessageId, ModelId, TaskId};
use pocketlm_llm::{Role, SessionConfig};

/// One conversation, with its per-chat inference settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub system_prompt: String,
    pub date_created: DateTime<Utc>,
    pub date_used: DateTime<Utc>,
    /// Model this chat generates with; `None` until one is selected.
    pub model_id: Option<ModelId>,
    pub min_p: f32,
    pub temperature: f32,
    pub context_size: u32,
    pub n_threads: u32,
    pub use_mmap: bool,
    pub use_mlock: bool,
    /// Chat-template override; `None` uses the model's embedded template.
    pub chat_template: Option<String>,
    /// Task-style chats are one-shot: prior turns are neither replayed
    /// on load nor retained by the engine across completions.
    pub is_task: bool,
}

impl Chat {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ChatId::new(),
            name: name.into(),
            system_prompt: String::new(),
            date_created: now,
            date_used: now,
            model_id: None,
            min_p: 0.05,
            temperature: 1.0,
            context_size: 2048,
            n_threads: 4,
            use_mmap: true,
            use_mlock: false,
            chat_template: None,
            is_task: false,
        }
    }

    /// The session configuration for loading this chat against the given
    /// model artifact.
    pub fn session_config(&self, model_path: impl AsRef<Path>) -> SessionConfig {
        let mut config = SessionConfig::new(self.id.clone(), model_path.as_ref())
            .with_retain_history(!self.is_task)
            .with_sampling(self.min_p, self.temperature)
            .with_context_size(self.context_size)
            .with_threads(self.n_threads)
            .with_memory_flags(self.use_mmap, self.use_mlock);
        if !self.system_prompt.is_empty() {
            config = config.with_system_prompt(self.system_prompt.clone());
        }
        if let Some(template) = &self.chat_template {
            config = config.with_chat_template(template.clone());
        }
        config
    }
}

/// One message within a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub role: Role,
    pub text: String,
    pub date_created: DateTime<Utc>,
}

impl ChatMessage {
    pub(crate) fn new(chat_id: ChatId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            chat_id,
            role,
            text: text.into(),
            date_created: Utc::now(),
        }
    }
}

/// A downloaded model artifact on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: ModelId,
    pub name: String,
    /// Where the artifact was downloaded from; empty for sideloaded files.
    pub url: String,
    pub path: PathBuf,
}

impl ModelRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: ModelId::new(),
            name: name.into(),
            url: url.into(),
            path: path.into(),
        }
    }
}

/// A reusable one-shot task preset (summarize, translate, ...). Running a
/// task creates a task-style chat from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub system_prompt: String,
    pub model_id: Option<ModelId>,
}

impl Task {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            system_prompt: system_prompt.into(),
            model_id: None,
        }
    }
}
