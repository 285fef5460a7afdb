//! User memory: persisted context records and the vault that manages them.

pub mod model;
pub mod repository;
pub mod vault;

pub use model::ContextRecord;
pub use repository::{ContextSlotRepository, InMemorySlotRepository};
pub use vault::ContextVault;
