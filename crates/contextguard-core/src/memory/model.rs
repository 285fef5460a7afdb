//! Context record domain model.
//!
//! This module contains the core ContextRecord entity that represents
//! a single user-saved memory in the application's domain layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How many leading words of the content become the record's display name.
const NAME_WORD_LIMIT: usize = 4;

/// A persisted user-supplied memory fact.
///
/// Records are created by the save path and destroyed by delete/clear.
/// There is no in-place edit path, so `updated_at == created_at` holds for
/// every record today; any future update path must bump `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Unique record identifier (`ctx_` prefix + UUID)
    pub id: String,
    /// Short display label derived from the leading words of `content`
    pub name: String,
    /// Full saved text, never empty
    pub content: String,
    /// Timestamp when the record was created
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last modification, `>= created_at`
    pub updated_at: DateTime<Utc>,
}

impl ContextRecord {
    /// Creates a new record with a fresh id and a name derived from the
    /// first few words of `content`.
    ///
    /// The caller is responsible for rejecting empty content; see
    /// `ContextVault::save`.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let now = Utc::now();
        Self {
            id: format!("ctx_{}", Uuid::new_v4()),
            name: derive_name(&content),
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Derives the short display name: the first four whitespace-separated words,
/// with an ellipsis marker appended when the content has more.
fn derive_name(content: &str) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let taken = &words[..words.len().min(NAME_WORD_LIMIT)];
    let mut name = taken.join(" ");
    if words.len() > NAME_WORD_LIMIT {
        name.push_str("...");
    }
    name
}
