//! Shared conversation transcript.
//!
//! The transcript is an append-only message log shared between the pipeline,
//! the reveal engine, and whatever front-end renders it. Assistant entries
//! are edited in place only by the session that created them.

use std::sync::Arc;
use tokio::sync::RwLock;

use contextguard_core::session::ChatMessage;

/// Thread-safe handle to the live message log.
#[derive(Clone, Default)]
pub struct Transcript {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
}

impl Transcript {
    /// Creates an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message and returns its id.
    pub async fn push(&self, message: ChatMessage) -> String {
        let id = message.id.clone();
        self.messages.write().await.push(message);
        id
    }

    /// Replaces the text of the message with the given id, if present.
    pub async fn set_text(&self, id: &str, text: impl Into<String>) {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.iter_mut().find(|m| m.id == id) {
            message.text = text.into();
        }
    }

    /// Returns the message with the given id, if present.
    pub async fn get(&self, id: &str) -> Option<ChatMessage> {
        self.messages.read().await.iter().find(|m| m.id == id).cloned()
    }

    /// Returns a copy of the full message log.
    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }

    /// Returns the number of messages.
    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    /// Returns true when no messages have been appended yet.
    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}
