//! Transcript aggregation: folds consecutive same-speaker fragments into display blocks.

use crate::models::transcript::SavedMessage;

/// Merges consecutive messages from the same speaker, joining their text with
/// a single space. A change of speaker starts a new block.
///
/// Idempotent: no two adjacent output blocks share a role, so aggregating the
/// output again returns it unchanged.
pub fn aggregate(messages: &[SavedMessage]) -> Vec<SavedMessage> {
    let mut blocks: Vec<SavedMessage> = Vec::with_capacity(messages.len());

    for message in messages {
        match blocks.last_mut() {
            Some(last) if last.role == message.role => {
                last.content.push(' ');
                last.content.push_str(&message.content);
            }
            _ => blocks.push(message.clone()),
        }
    }

    blocks
}

/// Renders a transcript as `- role: content` lines for embedding in a prompt.
pub fn format_for_review(messages: &[SavedMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("- {}: {}\n", m.role.as_str(), m.content))
        .collect()
}
