//! Utility functions for creating and summarising A2A Message objects.

use crate::types::{Message, Part, Role};
use crate::utils::constants::SUMMARY_MAX_CHARS;
use crate::utils::parts::get_text_parts;

/// Creates a [`Message`] containing a single text part.
///
/// # Example
///
/// ```
/// use a2a_recorder::types::Role;
/// use a2a_recorder::utils::create_text_message;
///
/// let msg = create_text_message(Role::User, "Hello, agent!");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.parts.len(), 1);
/// ```
pub fn create_text_message(role: Role, text: impl Into<String>) -> Message {
    Message::new(role, vec![Part::text(text)])
}

/// Concatenates the text of every text part. Data parts contribute nothing.
pub fn get_message_text(message: &Message) -> String {
    get_text_parts(&message.parts).concat()
}

/// Truncates `text` to [`SUMMARY_MAX_CHARS`] characters, appending a literal
/// `...` only when something was cut.
pub fn truncate_summary(text: &str) -> String {
    match text.char_indices().nth(SUMMARY_MAX_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// One-line summary of a message, as stored on an event record.
pub fn summarize_message(message: &Message) -> String {
    truncate_summary(&get_message_text(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_text_is_not_truncated() {
        let exactly = "x".repeat(50);
        assert_eq!(truncate_summary(&exactly), exactly);
        assert_eq!(truncate_summary("hi"), "hi");
    }

    #[test]
    fn long_text_keeps_fifty_chars_plus_ellipsis() {
        let long = "y".repeat(51);
        let summary = truncate_summary(&long);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.trim_end_matches("...").chars().count(), 50);
    }

    #[test]
    fn multibyte_text_truncates_on_char_boundary() {
        let long = "ü".repeat(60);
        let summary = truncate_summary(&long);
        assert_eq!(summary, format!("{}...", "ü".repeat(50)));
    }

    #[test]
    fn data_parts_do_not_contribute() {
        let msg = Message::new(
            Role::User,
            vec![
                Part::text("hello "),
                Part::data(json!({"ignored": true}), None),
                Part::text("world"),
            ],
        );
        assert_eq!(get_message_text(&msg), "hello world");
        assert_eq!(summarize_message(&msg), "hello world");
    }

    #[test]
    fn create_text_message_has_fresh_id() {
        let a = create_text_message(Role::User, "a");
        let b = create_text_message(Role::User, "a");
        assert_ne!(a.message_id, b.message_id);
        assert!(uuid::Uuid::parse_str(&a.message_id).is_ok());
    }
}
