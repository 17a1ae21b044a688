//! Streaming generation against the loaded session.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};

use crate::engine::{EngineError, Fragment, InferenceEngine};
use crate::transform::rewrite_reasoning;
use crate::{ConversationStore, LlmError};

use super::manager::SessionManager;
use super::types::{BusyGuard, CancelToken, GenerationOutcome, GenerationResult, LoadState};

/// How the pull loop stopped.
enum PullEnd {
    Completed,
    Cancelled,
}

impl<S: ConversationStore> SessionManager<S> {
    /// Drives one streaming generation to completion.
    ///
    /// The prompt is appended to the session as a user turn and the
    /// engine's fragment stream is pulled on a blocking task until the
    /// end-of-generation sentinel, a mid-stream error, or cancellation.
    /// `on_partial` receives the cumulative text after each fragment, so
    /// its argument only ever grows.
    ///
    /// On completion the assistant turn is persisted to the conversation
    /// store and `GenerationOutcome::Done` carries the final text (with
    /// reasoning spans rewritten), generation speed, elapsed seconds and
    /// context usage. A cancelled run returns
    /// `GenerationOutcome::Cancelled` and persists nothing. A mid-stream
    /// engine error discards the partial text and leaves the session
    /// loaded; the caller may retry.
    pub async fn generate(
        &mut self,
        prompt: impl Into<String>,
        cancel: &CancelToken,
        mut on_partial: impl FnMut(&str) + Send,
    ) -> Result<GenerationOutcome, LlmError> {
        if self.state != LoadState::Ready {
            return Err(LlmError::NotReady);
        }
        let _busy = BusyGuard::acquire(&self.generating)?;
        let Some(mut session) = self.session.take() else {
            return Err(LlmError::NotReady);
        };

        let prompt = prompt.into();
        let cancel = cancel.clone();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let started = Instant::now();

        debug!(chat = %session.chat_id, "generation started");
        let join = task::spawn_blocking(move || {
            let end = pull_loop(session.engine.as_mut(), &prompt, &cancel, &tx);
            (session, end)
        });

        let mut text = String::new();
        while let Some(piece) = rx.recv().await {
            text.push_str(&piece);
            on_partial(&text);
        }

        let (session, end) = join
            .await
            .map_err(|e| LlmError::GenerationFailed(format!("generation task failed: {e}")))?;

        if self.pending_discard {
            // A forced unload happened while we were generating; the
            // handle must not come back.
            self.pending_discard = false;
            debug!(chat = %session.chat_id, "session discarded after forced unload");
            return Ok(GenerationOutcome::Cancelled);
        }

        let stats = match &end {
            Ok(PullEnd::Completed) => Some((
                session.engine.generation_speed(),
                session.engine.context_tokens_used(),
            )),
            _ => None,
        };
        let chat_id = session.chat_id.clone();
        self.session = Some(session);

        match end {
            Err(e) => {
                // Partial text is discarded on purpose: half a response
                // is not worth persisting. The session stays loaded.
                warn!(chat = %chat_id, "generation failed: {e}");
                Err(LlmError::GenerationFailed(e.to_string()))
            }
            Ok(PullEnd::Cancelled) => {
                info!(chat = %chat_id, "generation cancelled");
                Ok(GenerationOutcome::Cancelled)
            }
            Ok(PullEnd::Completed) => {
                let text = rewrite_reasoning(&text);
                self.store.append_assistant_turn(&chat_id, &text)?;
                let (generation_speed, context_tokens_used) = stats.unwrap_or((0.0, 0));
                let result = GenerationResult {
                    text,
                    generation_speed,
                    duration_secs: started.elapsed().as_secs(),
                    context_tokens_used,
                };
                info!(
                    chat = %chat_id,
                    secs = result.duration_secs,
                    speed = result.generation_speed,
                    "generation complete"
                );
                Ok(GenerationOutcome::Done(result))
            }
        }
    }
}

/// Pulls fragments until EOG or cancellation, forwarding each piece to
/// the async side. The cancellation flag is polled once per fragment;
/// both the EOG and the cancelled path close the completion cleanly so a
/// later `generate` on the same session starts fresh. A mid-stream error
/// returns immediately without closing: the error already tore the
/// completion down on the engine side.
fn pull_loop(
    engine: &mut dyn InferenceEngine,
    prompt: &str,
    cancel: &CancelToken,
    tx: &mpsc::UnboundedSender<String>,
) -> Result<PullEnd, EngineError> {
    engine.begin_completion(prompt)?;
    let cancelled = loop {
        if cancel.is_cancelled() {
            break true;
        }
        match engine.next_fragment()? {
            Fragment::Text(piece) => {
                // A closed receiver means the caller dropped the generate
                // future; keep pulling so the completion still ends.
                let _ = tx.send(piece);
            }
            Fragment::Eog => break false,
        }
    };
    engine.end_completion()?;
    Ok(if cancelled {
        PullEnd::Cancelled
    } else {
        PullEnd::Completed
    })
}
