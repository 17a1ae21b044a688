//! The session manager: owns the single live engine handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::task;
use tracing::{debug, info, warn};

use pocketlm_common::ChatId;

use crate::engine::{EngineError, EngineLoader, InferenceEngine};
use crate::{ConversationStore, LlmError, Role};

use super::types::{LoadState, SessionConfig};

/// One loaded model instance. Exclusively owned by the manager (or,
/// while a generation runs, by the generation task); no other component
/// ever holds the engine handle.
pub(super) struct ModelSession {
    pub(super) engine: Box<dyn InferenceEngine>,
    pub(super) chat_id: ChatId,
}

/// Guarantees that exactly one model session is alive and correctly
/// initialized for the current chat, or that none is.
///
/// Loading a new session always unloads the previous one first, even for
/// the same model file: per-chat sampling and context configuration may
/// differ, so handles are never reused across chat switches.
pub struct SessionManager<S: ConversationStore> {
    loader: Arc<dyn EngineLoader>,
    pub(super) store: Arc<S>,
    pub(super) session: Option<ModelSession>,
    pub(super) state: LoadState,
    /// Set for the duration of a generation. The engine handle is inside
    /// the generation task while this is set, so unload must refuse.
    pub(super) generating: Arc<AtomicBool>,
    /// Set by a forced unload that raced a generation: the returning
    /// generation task drops the engine instead of restoring it.
    pub(super) pending_discard: bool,
}

impl<S: ConversationStore> SessionManager<S> {
    pub fn new(loader: Arc<dyn EngineLoader>, store: Arc<S>) -> Self {
        Self {
            loader,
            store,
            session: None,
            state: LoadState::NotLoaded,
            generating: Arc::new(AtomicBool::new(false)),
            pending_discard: false,
        }
    }

    /// Loads a model session for one chat, replacing any previous session.
    ///
    /// On success the system prompt (if any) is appended first, then every
    /// stored turn of the chat is replayed in chronological order — unless
    /// the chat is task-style, which starts from an empty context. On
    /// failure the state is `Failed` and no engine handle is retained.
    pub async fn load(&mut self, config: SessionConfig) -> Result<(), LlmError> {
        if self.generating.load(Ordering::Acquire) {
            return Err(LlmError::GenerationActive);
        }
        if self.session.take().is_some() {
            debug!("unloading previous session before load");
        }
        self.state = LoadState::Loading;

        let turns = if config.retain_history {
            match self.store.turns_for(&config.chat_id) {
                Ok(turns) => turns,
                Err(e) => {
                    self.state = LoadState::Failed;
                    return Err(e);
                }
            }
        } else {
            Vec::new()
        };

        let loader = Arc::clone(&self.loader);
        let params = config.engine_params();
        let system_prompt = config.system_prompt.clone().filter(|p| !p.is_empty());

        // Opening the handle and replaying history both block on the
        // native side; keep them off the caller's path.
        let joined = task::spawn_blocking(move || {
            let mut engine = loader.open(&params)?;
            if let Some(prompt) = &system_prompt {
                engine.append_message(Role::System, prompt)?;
            }
            for turn in &turns {
                engine.append_message(turn.role, &turn.text)?;
            }
            Ok::<_, EngineError>((engine, turns.len()))
        })
        .await;

        let result = match joined {
            Ok(result) => result,
            Err(e) => Err(EngineError::ModelLoad(format!("load task failed: {e}"))),
        };

        match result {
            Ok((engine, replayed)) => {
                info!(chat = %config.chat_id, replayed, "model session ready");
                self.session = Some(ModelSession {
                    engine,
                    chat_id: config.chat_id,
                });
                self.state = LoadState::Ready;
                Ok(())
            }
            Err(e) => {
                warn!(chat = %config.chat_id, "model load failed: {e}");
                self.state = LoadState::Failed;
                Err(LlmError::LoadFailed(e.to_string()))
            }
        }
    }

    /// Releases the engine handle if one is held. Safe to call when
    /// nothing is loaded; refuses while a generation is running.
    pub fn unload(&mut self) -> Result<(), LlmError> {
        if self.generating.load(Ordering::Acquire) {
            return Err(LlmError::GenerationActive);
        }
        if self.session.take().is_some() {
            info!("model session unloaded");
        }
        self.state = LoadState::NotLoaded;
        Ok(())
    }

    /// Forced unload for teardown paths (model deleted, app shutdown)
    /// that have already cancelled, or deliberately abandon, a running
    /// generation. The generation's outcome is reported as cancelled and
    /// nothing is persisted.
    pub fn force_unload(&mut self) {
        if self.generating.load(Ordering::Acquire) {
            warn!("forced unload while a generation is active");
            self.pending_discard = true;
        }
        if self.session.take().is_some() {
            info!("model session unloaded");
        }
        self.state = LoadState::NotLoaded;
    }

    pub fn load_state(&self) -> LoadState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LoadState::Ready
    }

    /// The chat the current session was loaded for, if any.
    pub fn current_chat(&self) -> Option<&ChatId> {
        self.session.as_ref().map(|s| &s.chat_id)
    }

    /// Tokens consumed in the model's context window. Returns 0 when no
    /// session is loaded (or while a generation holds the engine).
    pub fn context_tokens_used(&self) -> u32 {
        self.session
            .as_ref()
            .map(|s| s.engine.context_tokens_used())
            .unwrap_or(0)
    }
}
