//! Session and transcript domain types.

pub mod message;
pub mod model;
pub mod stage;

pub use message::{ChatMessage, Sender};
pub use model::GenerationSession;
pub use stage::Stage;
