pub mod json_slot_repository;
pub mod paths;

pub use json_slot_repository::JsonSlotRepository;
pub use paths::ContextGuardPaths;
