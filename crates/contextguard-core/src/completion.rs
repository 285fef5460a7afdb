//! Completion engine boundary.
//!
//! The engine performs one text completion per call and may fail; failure
//! is terminal for the calling stage. No retry or backoff is assumed here.

use async_trait::async_trait;

use crate::error::Result;

/// External text-generation collaborator, invoked once per pipeline stage.
#[async_trait]
pub trait CompletionEngine: Send + Sync {
    /// Performs one completion call for `prompt` and returns the text.
    ///
    /// # Errors
    ///
    /// Returns `ContextGuardError::Completion` on network, quota, or model
    /// errors.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
