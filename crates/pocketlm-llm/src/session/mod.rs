//! Session lifecycle: model load/unload, history replay, and
//! single-flight streaming generation.

mod generate;
mod manager;
mod types;


pub use manager::SessionManager;
pub use types::{CancelToken, GenerationOutcome, GenerationResult, LoadState, SessionConfig};
