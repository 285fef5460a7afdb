//! Generation pipeline stages.

use serde::{Deserialize, Serialize};

/// The lifecycle stage of a generation session.
///
/// `Idle` is the state before any session exists. The refinement stages run
/// strictly in order; `Done`, `Cancelled`, and `Errored` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    /// No session is running.
    Idle,
    /// First completion call: produce a raw draft answer.
    Drafting,
    /// Second completion call: strip artifacts and redundancy from the draft.
    Verifying,
    /// Third completion call: add structure and emphasis for readability.
    Formatting,
    /// Progressive delivery of the finished answer.
    Revealing,
    /// The answer was fully revealed.
    Done,
    /// The session was stopped before finishing.
    Cancelled,
    /// A completion call failed; the session ended with an apology.
    Errored,
}

impl Stage {
    /// Returns true for the terminal stages (`Done`, `Cancelled`, `Errored`).
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Cancelled | Stage::Errored)
    }
}
