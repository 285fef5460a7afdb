//! Unified path management for ContextGuard data files.
//!
//! All persisted state lives under the platform config directory, e.g.
//! `~/.config/contextguard/` on Linux.
//!
//! ```text
//! ~/.config/contextguard/
//! └── memory_contexts.json     # the persisted memory slot
//! ```

use std::path::PathBuf;

use contextguard_core::error::{ContextGuardError, Result};

/// Unified path resolution for ContextGuard.
pub struct ContextGuardPaths;

impl ContextGuardPaths {
    /// Returns the ContextGuard configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform config directory cannot be
    /// determined.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("contextguard"))
            .ok_or_else(|| ContextGuardError::io("cannot find config directory"))
    }

    /// Returns the path of the persisted memory slot file.
    pub fn memory_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("memory_contexts.json"))
    }
}
