//! Persisted-slot repository trait for context records.
//!
//! The memory collection lives in a single named slot (one file, one key)
//! that is always read and rewritten wholesale. The trait abstracts that
//! slot so tests and ephemeral sessions can substitute an in-memory double.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::memory::model::ContextRecord;

/// Storage backend for the context-record collection.
///
/// Implementations must treat a missing or unreadable slot as an empty
/// collection on `load` (corrupt data must not crash the caller), and must
/// overwrite the slot wholesale on `save`.
#[async_trait]
pub trait ContextSlotRepository: Send + Sync {
    /// Loads the full record collection; absent or corrupt data yields an
    /// empty collection.
    async fn load(&self) -> Result<Vec<ContextRecord>>;

    /// Overwrites the slot with the given collection.
    async fn save(&self, records: &[ContextRecord]) -> Result<()>;
}

/// An in-memory implementation of `ContextSlotRepository` for tests and
/// ephemeral (non-persisted) sessions.
#[derive(Default)]
pub struct InMemorySlotRepository {
    records: Arc<RwLock<Vec<ContextRecord>>>,
}

impl InMemorySlotRepository {
    /// Creates an empty in-memory slot.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContextSlotRepository for InMemorySlotRepository {
    async fn load(&self) -> Result<Vec<ContextRecord>> {
        Ok(self.records.read().await.clone())
    }

    async fn save(&self, records: &[ContextRecord]) -> Result<()> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }
}
