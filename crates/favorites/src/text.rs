//! Text helpers for list rendering

/// Suffix appended to truncated text
pub const ELLIPSIS: &str = "...";

/// Truncate `text` to at most `max_chars` characters, appending an ellipsis
/// when anything was cut.
///
/// Counts Unicode scalar values so multi-byte text is never split mid-character.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}{}", &text[..cut], ELLIPSIS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_text_is_cut() {
        let summary = "a".repeat(150);
        let shown = truncate_text(&summary, 100);
        assert_eq!(shown.len(), 103);
        assert!(shown.starts_with(&"a".repeat(100)));
        assert!(shown.ends_with(ELLIPSIS));
    }

    #[test]
    fn test_short_text_unchanged() {
        let summary = "b".repeat(80);
        assert_eq!(truncate_text(&summary, 100), summary);
    }

    #[test]
    fn test_exact_length_unchanged() {
        let summary = "c".repeat(100);
        assert_eq!(truncate_text(&summary, 100), summary);
    }

    #[test]
    fn test_multibyte_boundary() {
        let summary = "é".repeat(5);
        assert_eq!(truncate_text(&summary, 3), "ééé...");
        assert_eq!(truncate_text("", 3), "");
    }
}
