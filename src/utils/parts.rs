//! Utility functions for working with A2A Part objects.

use crate::types::Part;
use serde_json::Value;

/// Extracts text content from all text Parts in a list.
///
/// # Example
///
/// ```
/// use a2a_recorder::types::Part;
/// use a2a_recorder::utils::get_text_parts;
///
/// let parts = vec![Part::text("Hello"), Part::text("World")];
/// assert_eq!(get_text_parts(&parts), vec!["Hello", "World"]);
/// ```
pub fn get_text_parts(parts: &[Part]) -> Vec<&str> {
    parts.iter().filter_map(Part::as_text).collect()
}

/// Extracts data content from all data Parts in a list.
pub fn get_data_parts(parts: &[Part]) -> Vec<&Value> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Data { data, .. } => Some(data),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_and_data_are_separated() {
        let parts = vec![
            Part::text("a"),
            Part::data(json!({"x": 1}), None),
            Part::Unsupported,
            Part::text("b"),
        ];
        assert_eq!(get_text_parts(&parts), vec!["a", "b"]);
        assert_eq!(get_data_parts(&parts), vec![&json!({"x": 1})]);
    }

    #[test]
    fn empty_parts() {
        assert!(get_text_parts(&[]).is_empty());
        assert!(get_data_parts(&[]).is_empty());
    }
}
