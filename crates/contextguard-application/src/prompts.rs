//! Stage prompt construction for the refinement pipeline.

use contextguard_core::memory::ContextRecord;

/// Builds the Drafting prompt: the raw utterance, prefixed with the matched
/// memory when one exists.
pub fn draft_prompt(utterance: &str, matched: Option<&ContextRecord>) -> String {
    match matched {
        Some(record) => format!(
            "Based on this saved information: \"{}\"\n\nPlease answer this question: {}",
            record.content, utterance
        ),
        None => utterance.to_string(),
    }
}

/// Builds the Verifying prompt: clean up the draft without adding content.
pub fn verify_prompt(draft: &str) -> String {
    format!(
        "Review the following answer. Remove any stray leading markup characters, \
         duplicated content, and redundant phrasing. Respond with the corrected \
         answer only.\n\n{draft}"
    )
}

/// Builds the Formatting prompt: structure the verified answer for reading.
pub fn format_prompt(verified: &str) -> String {
    format!(
        "Format the following answer for readability: add headings, numbering, \
         and emphasis where helpful. Respond with the final formatted answer \
         only.\n\n{verified}"
    )
}
