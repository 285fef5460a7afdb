//! Save-directive detection for user utterances.
//!
//! An utterance that contains one of the save keywords as a whole word is
//! treated as a request to persist information rather than a question. The
//! payload is whatever follows the keyword and its separator; when no
//! separator form matches, the whole utterance is the payload.

use once_cell::sync::Lazy;
use regex::Regex;

/// Keywords that mark an utterance as a save directive.
pub const SAVE_KEYWORDS: [&str; 3] = ["save", "remember", "store"];

static KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(save|remember|store)\b").expect("keyword regex is valid"));

// Separator after the keyword: colon, dash, en dash, em dash, or whitespace.
static PAYLOAD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:save|remember|store)\b[:\-–—\s]*(.+)").expect("payload regex is valid")
});

/// Returns true iff the utterance contains a save keyword as a whole word,
/// case-insensitively.
///
/// Pure and total: never panics, never allocates beyond the regex engine.
pub fn is_save_directive(utterance: &str) -> bool {
    KEYWORD_RE.is_match(utterance)
}

/// Extracts the content to persist from a save directive.
///
/// Matches `<keyword><separator><rest>` and returns the trimmed `<rest>`.
/// Falls back to the entire trimmed utterance when no such form is present,
/// so the payload is never empty for a non-empty utterance.
pub fn extract_payload(utterance: &str) -> String {
    match PAYLOAD_RE.captures(utterance) {
        Some(caps) => caps[1].trim().to_string(),
        None => utterance.trim().to_string(),
    }
}
