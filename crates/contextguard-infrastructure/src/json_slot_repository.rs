//! File-backed implementation of the context slot repository.
//!
//! The whole memory collection lives in one JSON file that is read and
//! rewritten wholesale. A missing or unparsable file loads as an empty
//! collection; corruption is logged, never surfaced.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use contextguard_core::error::{ContextGuardError, Result};
use contextguard_core::memory::{ContextRecord, ContextSlotRepository};

use crate::paths::ContextGuardPaths;

/// Single-file JSON slot store for context records.
pub struct JsonSlotRepository {
    path: PathBuf,
}

impl JsonSlotRepository {
    /// Creates a repository at the default location
    /// (`<config dir>/contextguard/memory_contexts.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ContextGuardPaths::memory_file()?))
    }

    /// Creates a repository over an explicit file path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContextSlotRepository for JsonSlotRepository {
    async fn load(&self) -> Result<Vec<ContextRecord>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Vec::new());
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read memory slot, treating as empty");
                return Ok(Vec::new());
            }
        };

        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "memory slot is corrupt, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    async fn save(&self, records: &[ContextRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|err| {
                ContextGuardError::io(format!(
                    "failed to create directory {}: {}",
                    parent.display(),
                    err
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(records)?;
        fs::write(&self.path, json).await.map_err(|err| {
            ContextGuardError::io(format!(
                "failed to write memory slot {}: {}",
                self.path.display(),
                err
            ))
        })?;

        Ok(())
    }
}
