//! Generation session domain model.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::stage::Stage;

/// The stateful, cancellable run of the refinement pipeline for one user
/// utterance.
///
/// At most one session is active at a time: whoever starts a new session
/// must cancel the previous one first. The cancellation token is owned by
/// exactly one session and never shared across sessions; it moves only from
/// false to true and is never reset within the session's lifetime.
#[derive(Clone)]
pub struct GenerationSession {
    /// Unique session identifier.
    pub session_id: String,
    /// The utterance that triggered this session.
    pub user_prompt: String,
    /// The transcript entry this session writes into.
    pub placeholder_message_id: String,
    cancel: CancellationToken,
    stage: Arc<RwLock<Stage>>,
}

impl GenerationSession {
    /// Creates a new session in the `Drafting` stage with a fresh token.
    pub fn new(user_prompt: impl Into<String>, placeholder_message_id: impl Into<String>) -> Self {
        Self {
            session_id: format!("gen_{}", Uuid::new_v4()),
            user_prompt: user_prompt.into(),
            placeholder_message_id: placeholder_message_id.into(),
            cancel: CancellationToken::new(),
            stage: Arc::new(RwLock::new(Stage::Drafting)),
        }
    }

    /// Requests cooperative cancellation. Monotonic: once set it stays set.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The session's cancellation token, for handing to the reveal engine.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns the current stage.
    pub async fn stage(&self) -> Stage {
        *self.stage.read().await
    }

    /// Moves the session to a new stage.
    pub async fn set_stage(&self, stage: Stage) {
        *self.stage.write().await = stage;
    }

    /// Returns true while the session has not reached a terminal stage.
    pub async fn is_active(&self) -> bool {
        !self.stage().await.is_terminal()
    }
}
