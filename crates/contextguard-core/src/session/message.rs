//! Transcript message types.
//!
//! The transcript is an append-only log of chat messages. An assistant
//! message may be rewritten in place only while the session that created it
//! is still writing into it (placeholder, partial reveal, final text, or a
//! cancellation/error notice); once that session terminates it is frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents the author of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// Message from the user.
    User,
    /// Message from the assistant.
    Assistant,
}

/// A single entry in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier (`msg_` prefix + UUID)
    pub id: String,
    /// Message body. Mutable only while the owning session writes into it.
    pub text: String,
    /// Who authored the message.
    pub sender: Sender,
    /// Timestamp when the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Creates a message with a fresh id and the current timestamp.
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: format!("msg_{}", Uuid::new_v4()),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }

    /// Creates a user-authored message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Sender::User)
    }

    /// Creates an assistant-authored message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, Sender::Assistant)
    }
}
