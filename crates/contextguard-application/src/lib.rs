pub mod chat_usecase;
pub mod prompts;
pub mod reveal;
pub mod transcript;

pub use chat_usecase::ChatUseCase;
pub use reveal::{RevealFrame, RevealOutcome, TypewriterReveal};
pub use transcript::Transcript;
