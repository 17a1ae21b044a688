//! Session types and concurrency guards.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pocketlm_common::ChatId;

use crate::engine::EngineParams;
use crate::LlmError;

/// Readiness of the managed model session.
///
/// Transitions are driven exclusively by the session manager:
/// `NotLoaded --load--> Loading --> Ready | Failed`, and
/// `Ready --unload--> NotLoaded`. Generation is a transient sub-state of
/// `Ready`, not a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Ready,
    Failed,
}

/// Everything needed to load a model session for one chat.
///
/// Sessions are never reused across chats, even for the same model file:
/// sampling and context configuration are per-chat.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub chat_id: ChatId,
    pub model_path: PathBuf,
    pub system_prompt: Option<String>,
    /// False for task-style chats: prior turns are neither replayed on
    /// load nor accumulated by the engine across completions.
    pub retain_history: bool,
    pub min_p: f32,
    pub temperature: f32,
    pub context_size: u32,
    pub n_threads: u32,
    pub use_mmap: bool,
    pub use_mlock: bool,
    pub chat_template: Option<String>,
}

impl SessionConfig {
    pub fn new(chat_id: ChatId, model_path: impl Into<PathBuf>) -> Self {
        Self {
            chat_id,
            model_path: model_path.into(),
            system_prompt: None,
            retain_history: true,
            min_p: 0.05,
            temperature: 1.0,
            context_size: 2048,
            n_threads: 4,
            use_mmap: true,
            use_mlock: false,
            chat_template: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_retain_history(mut self, retain: bool) -> Self {
        self.retain_history = retain;
        self
    }

    pub fn with_sampling(mut self, min_p: f32, temperature: f32) -> Self {
        self.min_p = min_p;
        self.temperature = temperature;
        self
    }

    pub fn with_context_size(mut self, context_size: u32) -> Self {
        self.context_size = context_size;
        self
    }

    pub fn with_threads(mut self, n_threads: u32) -> Self {
        self.n_threads = n_threads;
        self
    }

    pub fn with_memory_flags(mut self, use_mmap: bool, use_mlock: bool) -> Self {
        self.use_mmap = use_mmap;
        self.use_mlock = use_mlock;
        self
    }

    pub fn with_chat_template(mut self, template: impl Into<String>) -> Self {
        self.chat_template = Some(template.into());
        self
    }

    pub(crate) fn engine_params(&self) -> EngineParams {
        EngineParams {
            model_path: self.model_path.clone(),
            min_p: self.min_p,
            temperature: self.temperature,
            retain_history: self.retain_history,
            context_size: self.context_size,
            chat_template: self.chat_template.clone(),
            n_threads: self.n_threads,
            use_mmap: self.use_mmap,
            use_mlock: self.use_mlock,
        }
    }
}

/// Shared cancellation flag for an in-flight generation.
///
/// Cancellation is cooperative and edge-triggered: the pulling loop polls
/// the flag once per fragment. A fragment pull that never returns can
/// therefore starve cancellation; no preemption is attempted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Measurements from one completed generation.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Final text, after reasoning-span rewriting.
    pub text: String,
    /// Tokens per second reported by the engine.
    pub generation_speed: f32,
    /// Wall-clock duration, whole seconds.
    pub duration_secs: u64,
    pub context_tokens_used: u32,
}

/// How a generation attempt ended. Cancellation is an expected
/// termination path, not an error; nothing is persisted for it.
#[derive(Debug, Clone)]
pub enum GenerationOutcome {
    Done(GenerationResult),
    Cancelled,
}

/// Guard that clears the generation flag on drop, ensuring it is always
/// released even if the future is dropped or an early return occurs.
pub(super) struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Attempt to mark a generation as in flight. Returns `Err` if one
    /// already is.
    pub(super) fn acquire(flag: &Arc<AtomicBool>) -> Result<Self, LlmError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(LlmError::GenerationActive);
        }
        Ok(Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
