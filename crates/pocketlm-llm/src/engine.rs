//! Contract against the native inference engine.
//!
//! The engine (a llama.cpp-style native binding) is performance-critical
//! and lives outside this crate; what is defined here is the narrow
//! surface the session layer drives it through. A handle is produced by
//! an [`EngineLoader`], owned exclusively by the session manager, and
//! released when the boxed engine is dropped.

use std::path::PathBuf;

use crate::Role;

/// Everything the engine needs to open a model handle.
#[derive(Debug, Clone)]
pub struct EngineParams {
    /// Path to the model artifact (GGUF file).
    pub model_path: PathBuf,
    /// Nucleus-probability floor for sampling.
    pub min_p: f32,
    pub temperature: f32,
    /// When false the engine treats each completion as one-shot and does
    /// not accumulate prior turns (task-style chats).
    pub retain_history: bool,
    /// Context window capacity, in tokens.
    pub context_size: u32,
    /// Chat-template override; `None` uses the template embedded in the
    /// model file.
    pub chat_template: Option<String>,
    pub n_threads: u32,
    pub use_mmap: bool,
    pub use_mlock: bool,
}

/// One pull from the engine's completion stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// An incremental piece of generated text.
    Text(String),
    /// End-of-generation sentinel; the stream is exhausted.
    Eog,
}

/// A loaded model instance.
///
/// Completion is a strict begin / pull-until-[`Fragment::Eog`] / end
/// cycle; the engine is not reentrant, so a new cycle must not begin
/// until the previous one was ended. The session layer enforces that.
pub trait InferenceEngine: Send {
    /// Appends one conversation turn to the engine's context.
    fn append_message(&mut self, role: Role, text: &str) -> Result<(), EngineError>;

    /// Appends the prompt as a user turn and starts a completion.
    fn begin_completion(&mut self, prompt: &str) -> Result<(), EngineError>;

    /// Produces the next generated text fragment, or [`Fragment::Eog`]
    /// once the engine is done. Blocking; one model step per call.
    fn next_fragment(&mut self) -> Result<Fragment, EngineError>;

    /// Closes the current completion so a later one can begin.
    fn end_completion(&mut self) -> Result<(), EngineError>;

    /// Tokens per second of the last completed response.
    fn generation_speed(&self) -> f32;

    /// Tokens consumed so far in the model's context window.
    fn context_tokens_used(&self) -> u32;
}

/// Opens engine handles. Implemented by the native binding; a scripted
/// implementation backs the tests in this crate.
pub trait EngineLoader: Send + Sync {
    fn open(&self, params: &EngineParams) -> Result<Box<dyn InferenceEngine>, EngineError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("context window exhausted")]
    ContextExhausted,
}
