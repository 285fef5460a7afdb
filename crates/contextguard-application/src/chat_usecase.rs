//! Chat use case: the context-aware generation pipeline.
//!
//! One user utterance flows through save-detection, memory matching, three
//! sequential refinement completions (draft, verify, format), and finally a
//! typewriter reveal into the transcript. At most one generation session is
//! active at a time; starting a new one cancels the previous session before
//! its replacement placeholder exists. Cancellation is cooperative and
//! observed at suspension points only: an in-flight completion call is never
//! aborted, its result is discarded instead.

use std::sync::Arc;
use tokio::sync::{RwLock, watch};

use contextguard_core::completion::CompletionEngine;
use contextguard_core::detector;
use contextguard_core::error::{ContextGuardError, Result};
use contextguard_core::memory::{ContextRecord, ContextVault};
use contextguard_core::session::{ChatMessage, GenerationSession, Stage};

use crate::prompts;
use crate::reveal::{RevealFrame, RevealOutcome, TypewriterReveal};
use crate::transcript::Transcript;

/// Placeholder text written when a stage observes cancellation.
const STOPPED_PLACEHOLDER_TEXT: &str = "(generation stopped)";
/// Notice appended to the transcript the moment the user stops a run.
const STOPPED_NOTICE: &str = "(stopped by user)";
/// Notice appended when a regeneration starts.
const REGENERATING_NOTICE: &str = "(regenerating…)";
/// Apology written into the placeholder when a completion call fails.
const COMPLETION_APOLOGY: &str = "I'm here to help! Please try your question again.";

fn save_confirmation(name: &str) -> String {
    format!("✅ I've saved: \"{name}\"\nI'll remember this for future conversations.")
}

fn memory_tag(name: &str) -> String {
    format!("🔍 Using: \"{name}\"\n\n")
}

/// Why a refinement stage did not produce output.
enum StageHalt {
    Cancelled,
    Errored(ContextGuardError),
}

/// Coordinates the transcript, the memory vault, the completion engine, and
/// the reveal into one conversational flow.
#[derive(Clone)]
pub struct ChatUseCase {
    engine: Arc<dyn CompletionEngine>,
    vault: Arc<ContextVault>,
    transcript: Transcript,
    /// The single active (or most recently finished) generation session.
    active: Arc<RwLock<Option<GenerationSession>>>,
    /// Prompt of the last generation run, for regenerate.
    last_prompt: Arc<RwLock<Option<String>>>,
    /// Cached memory listing for front-ends, refreshed after every change.
    memories: Arc<RwLock<Vec<ContextRecord>>>,
    reveal: TypewriterReveal,
    frames: Arc<watch::Sender<Option<RevealFrame>>>,
}

impl ChatUseCase {
    /// Creates a use case over the given engine and vault.
    pub fn new(engine: Arc<dyn CompletionEngine>, vault: Arc<ContextVault>) -> Self {
        let (frames, _) = watch::channel(None);
        Self {
            engine,
            vault,
            transcript: Transcript::new(),
            active: Arc::new(RwLock::new(None)),
            last_prompt: Arc::new(RwLock::new(None)),
            memories: Arc::new(RwLock::new(Vec::new())),
            reveal: TypewriterReveal::new(),
            frames: Arc::new(frames),
        }
    }

    /// Replaces the reveal configuration (tests use the instant variant).
    pub fn with_reveal(mut self, reveal: TypewriterReveal) -> Self {
        self.reveal = reveal;
        self
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Handles one user utterance end to end.
    ///
    /// Appends the user message, then either persists a save directive and
    /// confirms it, or runs the full refinement pipeline. The call returns
    /// once the session has reached a terminal stage.
    pub async fn handle_user_message(&self, utterance: &str) -> Result<()> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Ok(());
        }

        self.transcript.push(ChatMessage::user(utterance)).await;

        if detector::is_save_directive(utterance) {
            let payload = detector::extract_payload(utterance);
            match self.vault.save(&payload).await {
                Ok(record) => {
                    self.transcript
                        .push(ChatMessage::assistant(save_confirmation(&record.name)))
                        .await;
                    self.refresh_memories().await;
                    return Ok(());
                }
                Err(err) if err.is_validation() => {
                    // Nothing extractable to store; answer the utterance
                    // like any other question instead.
                    tracing::debug!("save directive had an empty payload, generating instead");
                }
                Err(err) => return Err(err),
            }
        }

        self.run_generation(utterance).await
    }

    /// Requests cancellation of the active session, if any, and surfaces a
    /// stop notice. Regeneration stays available via the last known prompt.
    pub async fn stop(&self) {
        let session = { self.active.read().await.clone() };
        if let Some(session) = session {
            if session.is_active().await {
                session.cancel();
                self.transcript
                    .push(ChatMessage::assistant(STOPPED_NOTICE))
                    .await;
                tracing::info!(session_id = %session.session_id, "generation stopped by user");
            }
        }
    }

    /// Re-runs the pipeline with the last generation prompt. A no-op when no
    /// generation has happened yet.
    pub async fn regenerate(&self) -> Result<()> {
        let prompt = { self.last_prompt.read().await.clone() };
        let Some(prompt) = prompt else {
            return Ok(());
        };

        self.transcript
            .push(ChatMessage::assistant(REGENERATING_NOTICE))
            .await;
        self.run_generation(&prompt).await
    }

    // ========================================================================
    // Transcript boundary accessors
    // ========================================================================

    /// Returns a copy of the live message log.
    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.snapshot().await
    }

    /// Returns the current session stage, or `Idle` before any session.
    pub async fn current_stage(&self) -> Stage {
        let session = { self.active.read().await.clone() };
        match session {
            Some(session) => session.stage().await,
            None => Stage::Idle,
        }
    }

    /// True while a session can still be stopped.
    pub async fn can_stop(&self) -> bool {
        let session = { self.active.read().await.clone() };
        match session {
            Some(session) => session.is_active().await,
            None => false,
        }
    }

    /// True once a prompt is remembered for regeneration.
    pub async fn can_regenerate(&self) -> bool {
        self.last_prompt.read().await.is_some()
    }

    /// Subscribes to reveal progress frames.
    pub fn subscribe_reveal(&self) -> watch::Receiver<Option<RevealFrame>> {
        self.frames.subscribe()
    }

    /// The partial text currently being revealed, if a reveal is running.
    pub async fn current_reveal_text(&self) -> Option<String> {
        if self.current_stage().await != Stage::Revealing {
            return None;
        }
        self.frames.borrow().as_ref().map(|frame| frame.text.clone())
    }

    /// Returns the cached memory listing.
    pub async fn memories(&self) -> Vec<ContextRecord> {
        self.memories.read().await.clone()
    }

    /// Lists all saved memories, refreshing the cached listing.
    pub async fn list_memories(&self) -> Vec<ContextRecord> {
        self.refresh_memories().await;
        self.memories().await
    }

    /// Deletes one memory and surfaces a notice.
    pub async fn delete_memory(&self, id: &str) {
        self.vault.delete(id).await;
        self.transcript
            .push(ChatMessage::assistant("Memory deleted"))
            .await;
        self.refresh_memories().await;
    }

    /// Deletes every memory and surfaces a notice.
    pub async fn clear_memories(&self) {
        self.vault.clear_all().await;
        self.transcript
            .push(ChatMessage::assistant("All memories cleared"))
            .await;
        self.refresh_memories().await;
    }

    // ========================================================================
    // Pipeline internals
    // ========================================================================

    async fn run_generation(&self, utterance: &str) -> Result<()> {
        *self.last_prompt.write().await = Some(utterance.to_string());

        let session = self.begin_session(utterance).await;
        self.run_pipeline(&session).await;
        Ok(())
    }

    /// Creates the new session under the single-flight invariant: the prior
    /// session's token is cancelled before the new placeholder exists.
    async fn begin_session(&self, utterance: &str) -> GenerationSession {
        let mut active = self.active.write().await;

        if let Some(prev) = active.as_ref() {
            if prev.is_active().await {
                tracing::debug!(session_id = %prev.session_id, "cancelling superseded session");
                prev.cancel();
            }
        }

        let placeholder_id = self.transcript.push(ChatMessage::assistant("")).await;
        let session = GenerationSession::new(utterance, placeholder_id);
        *active = Some(session.clone());
        session
    }

    async fn run_pipeline(&self, session: &GenerationSession) {
        let matched = self.vault.best_match(&session.user_prompt).await;
        if let Some(record) = &matched {
            tracing::debug!(name = %record.name, "augmenting prompt with saved context");
        }

        let draft = match self
            .run_stage(
                session,
                Stage::Drafting,
                prompts::draft_prompt(&session.user_prompt, matched.as_ref()),
            )
            .await
        {
            Ok(text) => text,
            Err(halt) => return self.finish_halted(session, halt).await,
        };

        let verified = match self
            .run_stage(session, Stage::Verifying, prompts::verify_prompt(&draft))
            .await
        {
            Ok(text) => text,
            Err(halt) => return self.finish_halted(session, halt).await,
        };

        let formatted = match self
            .run_stage(session, Stage::Formatting, prompts::format_prompt(&verified))
            .await
        {
            Ok(text) => text,
            Err(halt) => return self.finish_halted(session, halt).await,
        };

        let final_text = match &matched {
            Some(record) => format!("{}{}", memory_tag(&record.name), formatted),
            None => formatted,
        };

        session.set_stage(Stage::Revealing).await;
        let outcome = self
            .reveal
            .run(
                &final_text,
                &session.placeholder_message_id,
                session.token(),
                &self.transcript,
                &self.frames,
            )
            .await;

        match outcome {
            RevealOutcome::Completed => {
                session.set_stage(Stage::Done).await;
                // A save processed on an earlier turn may have changed the
                // memory set; re-query now that the answer is committed.
                self.refresh_memories().await;
                tracing::debug!(session_id = %session.session_id, "session completed");
            }
            RevealOutcome::Stopped => {
                session.set_stage(Stage::Cancelled).await;
                tracing::debug!(session_id = %session.session_id, "session stopped mid-reveal");
            }
        }
    }

    /// Runs one refinement stage: a cancellation check, one completion call,
    /// and a late-cancellation check that discards a result arriving after a
    /// stop request.
    async fn run_stage(
        &self,
        session: &GenerationSession,
        stage: Stage,
        prompt: String,
    ) -> std::result::Result<String, StageHalt> {
        if session.is_cancelled() {
            return Err(StageHalt::Cancelled);
        }

        session.set_stage(stage).await;
        tracing::debug!(session_id = %session.session_id, ?stage, "running stage");

        match self.engine.complete(&prompt).await {
            Err(err) => Err(StageHalt::Errored(err)),
            Ok(_) if session.is_cancelled() => Err(StageHalt::Cancelled),
            Ok(text) => Ok(text),
        }
    }

    async fn finish_halted(&self, session: &GenerationSession, halt: StageHalt) {
        match halt {
            StageHalt::Cancelled => {
                self.transcript
                    .set_text(&session.placeholder_message_id, STOPPED_PLACEHOLDER_TEXT)
                    .await;
                session.set_stage(Stage::Cancelled).await;
            }
            StageHalt::Errored(err) => {
                tracing::warn!(session_id = %session.session_id, error = %err, "completion stage failed");
                self.transcript
                    .set_text(&session.placeholder_message_id, COMPLETION_APOLOGY)
                    .await;
                session.set_stage(Stage::Errored).await;
            }
        }
    }

    async fn refresh_memories(&self) {
        *self.memories.write().await = self.vault.list().await;
    }
}
