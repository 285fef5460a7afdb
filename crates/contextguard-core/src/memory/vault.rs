//! The context vault: save, list, delete, and relevance-match user memories.
//!
//! The vault owns the persisted collection exclusively; other components
//! only ever see copies returned from queries. Every mutating call reads the
//! slot, applies the change, and writes the whole collection back. A failed
//! write is logged and swallowed so that a full disk or quota error never
//! breaks the conversation flow.

use std::sync::Arc;

use crate::error::{ContextGuardError, Result};
use crate::memory::model::ContextRecord;
use crate::memory::repository::ContextSlotRepository;

/// Minimum word length (in characters) considered during relevance matching.
const MATCH_WORD_MIN_CHARS: usize = 3;

/// Service managing the persisted memory collection.
pub struct ContextVault {
    repo: Arc<dyn ContextSlotRepository>,
}

impl ContextVault {
    /// Creates a vault over the given slot repository.
    pub fn new(repo: Arc<dyn ContextSlotRepository>) -> Self {
        Self { repo }
    }

    /// Persists a new memory record.
    ///
    /// The record's name is derived from the first four words of `content`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `content` is empty after trimming. A failing
    /// slot write is logged and swallowed; the record is still returned.
    pub async fn save(&self, content: &str) -> Result<ContextRecord> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(ContextGuardError::validation(
                "cannot save an empty memory",
            ));
        }

        let record = ContextRecord::new(trimmed);
        let mut records = self.load_or_empty().await;
        records.push(record.clone());
        self.persist(&records).await;

        tracing::debug!(id = %record.id, name = %record.name, "saved context record");
        Ok(record)
    }

    /// Returns all records ordered by `updated_at` descending.
    ///
    /// Ties keep their insertion order (stable sort).
    pub async fn list(&self) -> Vec<ContextRecord> {
        let mut records = self.load_or_empty().await;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        records
    }

    /// Deletes the record with the given id. Silently succeeds if absent.
    pub async fn delete(&self, id: &str) {
        let mut records = self.load_or_empty().await;
        records.retain(|r| r.id != id);
        self.persist(&records).await;
    }

    /// Removes every record.
    pub async fn clear_all(&self) {
        self.persist(&[]).await;
    }

    /// Returns every record relevant to `query`, in storage order.
    ///
    /// A record matches when the lowercased query contains, as a raw
    /// substring, any word longer than three characters taken from the
    /// record's name and content. Substring (not token-boundary) matching is
    /// intentional and matches the observed precision/recall trade-off.
    pub async fn find_relevant(&self, query: &str) -> Vec<ContextRecord> {
        let query_lower = query.to_lowercase();
        self.load_or_empty()
            .await
            .into_iter()
            .filter(|record| {
                let haystack = format!("{} {}", record.name, record.content).to_lowercase();
                haystack
                    .split_whitespace()
                    .filter(|word| word.chars().count() > MATCH_WORD_MIN_CHARS)
                    .any(|word| query_lower.contains(word))
            })
            .collect()
    }

    /// Returns the single best match for `query`: the most recently updated
    /// relevant record, ties broken by `list()` ordering.
    pub async fn best_match(&self, query: &str) -> Option<ContextRecord> {
        let matches = self.find_relevant(query).await;
        if matches.is_empty() {
            return None;
        }
        let matched_ids: Vec<&str> = matches.iter().map(|r| r.id.as_str()).collect();
        self.list()
            .await
            .into_iter()
            .find(|r| matched_ids.contains(&r.id.as_str()))
    }

    async fn load_or_empty(&self) -> Vec<ContextRecord> {
        match self.repo.load().await {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load context records, treating as empty");
                Vec::new()
            }
        }
    }

    async fn persist(&self, records: &[ContextRecord]) {
        if let Err(err) = self.repo.save(records).await {
            tracing::warn!(error = %err, "failed to persist context records");
        }
    }
}
