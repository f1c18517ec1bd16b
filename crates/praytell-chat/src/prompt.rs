//! Prompt composition

use praytell_core::{ContextRecord, PromptMessage};

/// Standing instruction sent ahead of every user message
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant. Consider the user's current location and the current datetime when formulating your response.";

/// Retrieved records as blank-line separated blocks, nearest first.
pub fn format_context(records: &[ContextRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "Message: {}\nLocation: {}\nDatetime: {}",
                r.body, r.location, r.timestamp
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// System instruction followed by one user message carrying the context,
/// the user's situation and the message itself.
pub fn build_prompt(
    records: &[ContextRecord],
    location: &str,
    datetime: &str,
    message: &str,
) -> Vec<PromptMessage> {
    let content = format!(
        "Context:\n{}\n\nCurrent User Location: {}\nCurrent Datetime: {}\n\nUser's message: {}",
        format_context(records),
        location,
        datetime,
        message
    );

    vec![
        PromptMessage::system(SYSTEM_INSTRUCTION),
        PromptMessage::user(content),
    ]
}
