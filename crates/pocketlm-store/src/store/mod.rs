//! The JSON-file-backed entity store.
//!
//! One `store.json` under the data directory holds all chats, messages,
//! models, and tasks. Every mutation is written through to disk. A
//! missing file means a fresh store; a corrupt file is an error rather
//! than silent data loss.

#[cfg(test)]
mod tests;

use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pocketlm_common::{paths, ChatId, ModelId, TaskId};
use pocketlm_llm::{ChatTurn, ConversationStore, LlmError, Role};

use crate::types::{Chat, ChatMessage, ModelRecord, Task};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Path(#[from] pocketlm_common::PathError),

    #[error("not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct State {
    chats: Vec<Chat>,
    messages: Vec<ChatMessage>,
    models: Vec<ModelRecord>,
    tasks: Vec<Task>,
}

#[derive(Debug)]
pub struct ChatStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl ChatStore {
    /// Opens the store file at `path`, starting fresh if it does not
    /// exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no store at {}, starting fresh", path.display());
                State::default()
            }
            Err(e) => return Err(e.into()),
        };
        info!("opened entity store at {}", path.display());
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    /// Opens the store at its platform default location, creating the
    /// data directories if needed.
    pub fn open_default() -> Result<Self, StoreError> {
        paths::ensure_dirs()?;
        Self::open(paths::store_file()?)
    }

    fn save(&self, state: &State) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    // --- chats ---

    pub fn add_chat(&self, chat: Chat) -> Result<Chat, StoreError> {
        let mut state = self.state.write().unwrap();
        state.chats.push(chat.clone());
        self.save(&state)?;
        debug!(chat = %chat.id, "chat added");
        Ok(chat)
    }

    /// All chats, most recently used first.
    pub fn chats(&self) -> Vec<Chat> {
        let state = self.state.read().unwrap();
        let mut chats = state.chats.clone();
        chats.sort_by(|a, b| b.date_used.cmp(&a.date_used));
        chats
    }

    pub fn chat(&self, id: &ChatId) -> Option<Chat> {
        let state = self.state.read().unwrap();
        state.chats.iter().find(|c| c.id == *id).cloned()
    }

    pub fn update_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        let slot = state
            .chats
            .iter_mut()
            .find(|c| c.id == chat.id)
            .ok_or_else(|| StoreError::NotFound(format!("chat {}", chat.id)))?;
        *slot = chat.clone();
        self.save(&state)
    }

    /// Deletes a chat and all of its messages.
    pub fn delete_chat(&self, id: &ChatId) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state.chats.retain(|c| c.id != *id);
        state.messages.retain(|m| m.chat_id != *id);
        self.save(&state)?;
        debug!(chat = %id, "chat deleted");
        Ok(())
    }

    /// Bumps a chat's last-used timestamp.
    pub fn mark_used(&self, id: &ChatId) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        let chat = state
            .chats
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or_else(|| StoreError::NotFound(format!("chat {id}")))?;
        chat.date_used = chrono::Utc::now();
        self.save(&state)
    }

    pub fn recently_used_chat(&self) -> Option<Chat> {
        self.chats().into_iter().next()
    }

    /// The chat to open on startup: the most recently used one, or a
    /// fresh "Untitled" chat when the store is empty.
    pub fn default_chat(&self) -> Result<Chat, StoreError> {
        if let Some(chat) = self.recently_used_chat() {
            return Ok(chat);
        }
        self.add_chat(Chat::new("Untitled"))
    }

    // --- messages ---

    pub fn add_user_message(&self, chat: &ChatId, text: &str) -> Result<ChatMessage, StoreError> {
        self.add_message(chat, Role::User, text)
    }

    pub fn add_assistant_message(
        &self,
        chat: &ChatId,
        text: &str,
    ) -> Result<ChatMessage, StoreError> {
        self.add_message(chat, Role::Assistant, text)
    }

    fn add_message(
        &self,
        chat: &ChatId,
        role: Role,
        text: &str,
    ) -> Result<ChatMessage, StoreError> {
        let message = ChatMessage::new(chat.clone(), role, text);
        let mut state = self.state.write().unwrap();
        state.messages.push(message.clone());
        self.save(&state)?;
        Ok(message)
    }

    /// Messages of one chat, in the order they were recorded.
    pub fn messages_for(&self, chat: &ChatId) -> Vec<ChatMessage> {
        let state = self.state.read().unwrap();
        state
            .messages
            .iter()
            .filter(|m| m.chat_id == *chat)
            .cloned()
            .collect()
    }

    /// Clears a chat's history without deleting the chat itself.
    pub fn delete_messages(&self, chat: &ChatId) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state.messages.retain(|m| m.chat_id != *chat);
        self.save(&state)
    }

    // --- models ---

    pub fn add_model(&self, model: ModelRecord) -> Result<ModelRecord, StoreError> {
        let mut state = self.state.write().unwrap();
        state.models.push(model.clone());
        self.save(&state)?;
        info!(model = %model.id, path = %model.path.display(), "model added");
        Ok(model)
    }

    pub fn models(&self) -> Vec<ModelRecord> {
        self.state.read().unwrap().models.clone()
    }

    pub fn model(&self, id: &ModelId) -> Option<ModelRecord> {
        let state = self.state.read().unwrap();
        state.models.iter().find(|m| m.id == *id).cloned()
    }

    /// Deletes a model record. Chats pointing at it fall back to no
    /// selected model; the caller is expected to have unloaded any live
    /// session using it first.
    pub fn delete_model(&self, id: &ModelId) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state.models.retain(|m| m.id != *id);
        for chat in state
            .chats
            .iter_mut()
            .filter(|c| c.model_id.as_ref() == Some(id))
        {
            chat.model_id = None;
        }
        self.save(&state)?;
        info!(model = %id, "model deleted");
        Ok(())
    }

    // --- tasks ---

    pub fn add_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut state = self.state.write().unwrap();
        state.tasks.push(task.clone());
        self.save(&state)?;
        Ok(task)
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.read().unwrap().tasks.clone()
    }

    pub fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        let slot = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", task.id)))?;
        *slot = task.clone();
        self.save(&state)
    }

    pub fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let mut state = self.state.write().unwrap();
        state.tasks.retain(|t| t.id != *id);
        self.save(&state)
    }
}

impl ConversationStore for ChatStore {
    fn turns_for(&self, chat: &ChatId) -> Result<Vec<ChatTurn>, LlmError> {
        Ok(self
            .messages_for(chat)
            .into_iter()
            .map(|m| ChatTurn {
                role: m.role,
                text: m.text,
            })
            .collect())
    }

    fn append_assistant_turn(&self, chat: &ChatId, text: &str) -> Result<(), LlmError> {
        self.add_assistant_message(chat, text)
            .map(|_| ())
            .map_err(|e| LlmError::Store(e.to_string()))
    }
}
