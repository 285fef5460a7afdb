//! Typewriter reveal of a finished answer.
//!
//! The reveal turns a complete answer string into a cancellable sequence of
//! growing prefixes written into the placeholder message, with a small random
//! pause between characters. The pause is cosmetic only; characters are
//! always emitted in source order. A reveal run is finite and never
//! restarted: each session constructs its own.

use rand::Rng;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::transcript::Transcript;

/// Suffix appended to whatever was displayed when a reveal is stopped early.
const STOPPED_SUFFIX: &str = " …(stopped)";

/// One step of reveal progress, published for front-ends.
#[derive(Debug, Clone)]
pub struct RevealFrame {
    /// Id of the message being revealed into.
    pub message_id: String,
    /// The text shown so far (a prefix of the final text, or the stopped form).
    pub text: String,
}

/// How a reveal run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    /// Every character was emitted and the full text committed.
    Completed,
    /// Cancellation was observed; the placeholder holds the stopped form.
    Stopped,
}

/// Progressive reveal with a bounded random inter-character delay.
#[derive(Debug, Clone, Copy)]
pub struct TypewriterReveal {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

impl Default for TypewriterReveal {
    fn default() -> Self {
        Self::new()
    }
}

impl TypewriterReveal {
    /// Creates a reveal with the standard 10-50ms delay range.
    pub fn new() -> Self {
        Self {
            min_delay_ms: 10,
            max_delay_ms: 50,
        }
    }

    /// Creates a reveal with a custom delay range in milliseconds.
    pub fn with_delay_range(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms,
        }
    }

    /// Creates a zero-delay reveal for tests.
    pub fn instant() -> Self {
        Self::with_delay_range(0, 0)
    }

    /// Reveals `full_text` into the placeholder message character by
    /// character, checking `cancel` before the first character and between
    /// every subsequent pair.
    ///
    /// On cancellation the placeholder is finalized as
    /// `<displayed so far> …(stopped)`. On completion the placeholder is
    /// replaced wholesale with the exact `full_text`.
    pub async fn run(
        &self,
        full_text: &str,
        placeholder_id: &str,
        cancel: &CancellationToken,
        transcript: &Transcript,
        frames: &watch::Sender<Option<RevealFrame>>,
    ) -> RevealOutcome {
        let mut shown = String::with_capacity(full_text.len());

        for ch in full_text.chars() {
            if cancel.is_cancelled() {
                let stopped = format!("{shown}{STOPPED_SUFFIX}");
                transcript.set_text(placeholder_id, stopped.clone()).await;
                frames.send_replace(Some(RevealFrame {
                    message_id: placeholder_id.to_string(),
                    text: stopped,
                }));
                return RevealOutcome::Stopped;
            }

            shown.push(ch);
            transcript.set_text(placeholder_id, shown.clone()).await;
            frames.send_replace(Some(RevealFrame {
                message_id: placeholder_id.to_string(),
                text: shown.clone(),
            }));

            tokio::time::sleep(Duration::from_millis(self.pick_delay())).await;
        }

        // Commit the original string wholesale, dropping any partial-state
        // artifacts in one step.
        transcript.set_text(placeholder_id, full_text).await;
        frames.send_replace(Some(RevealFrame {
            message_id: placeholder_id.to_string(),
            text: full_text.to_string(),
        }));
        RevealOutcome::Completed
    }

    fn pick_delay(&self) -> u64 {
        if self.max_delay_ms <= self.min_delay_ms {
            return self.min_delay_ms;
        }
        rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms)
    }
}
