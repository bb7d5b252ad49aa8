//! Small shared helpers.

/// Maximum length of a persisted error message, in characters.
///
/// Error text is shown to end users by the CRUD layer; anything longer
/// than this is encoder/transcriber log spew, not explanation.
pub const MAX_ERROR_LEN: usize = 1000;

/// Truncate an error message to [`MAX_ERROR_LEN`] characters.
///
/// Truncation happens on a character boundary so multi-byte input never
/// produces invalid UTF-8.
pub fn truncate_error(message: &str) -> String {
    if message.chars().count() <= MAX_ERROR_LEN {
        return message.to_string();
    }
    let truncated: String = message.chars().take(MAX_ERROR_LEN - 3).collect();
    format!("{}...", truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_unchanged() {
        assert_eq!(truncate_error("encode failed"), "encode failed");
    }

    #[test]
    fn test_long_message_truncated() {
        let long = "x".repeat(5000);
        let out = truncate_error(&long);
        assert_eq!(out.chars().count(), MAX_ERROR_LEN);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_multibyte_boundary() {
        let long = "é".repeat(2000);
        let out = truncate_error(&long);
        assert_eq!(out.chars().count(), MAX_ERROR_LEN);
    }
}
