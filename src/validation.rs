use serde_json::Value;

use crate::error::ApiError;

/// Maximum accepted length of a mood entry, in characters before trimming
pub const MAX_TEXT_CHARS: usize = 1000;

/// Extract and validate the `text` field of a request body.
///
/// Rejects a missing or non-string field, text that is empty after
/// trimming, and text longer than [`MAX_TEXT_CHARS`]. Returns the raw
/// (untrimmed) text; trimming happens during analysis.
pub fn mood_text(body: &Value) -> Result<String, ApiError> {
    let text = body
        .get("text")
        .ok_or_else(|| ApiError::validation("'text' field is required"))?
        .as_str()
        .ok_or_else(|| ApiError::validation("'text' must be a string"))?;

    if text.trim().is_empty() {
        return Err(ApiError::validation("'text' must not be empty"));
    }

    if text.chars().count() > MAX_TEXT_CHARS {
        return Err(ApiError::validation(format!(
            "'text' must be at most {} characters",
            MAX_TEXT_CHARS
        )));
    }

    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_plain_text() {
        let body = json!({ "text": "feeling great today" });
        assert_eq!(mood_text(&body).unwrap(), "feeling great today");
    }

    #[test]
    fn test_rejects_missing_field() {
        let body = json!({ "mood": "happy" });
        let err = mood_text(&body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_string_field() {
        let body = json!({ "text": 42 });
        let err = mood_text(&body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_rejects_whitespace_only() {
        let body = json!({ "text": "   \n\t  " });
        let err = mood_text(&body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_rejects_over_length() {
        let body = json!({ "text": "x".repeat(MAX_TEXT_CHARS + 1) });
        let err = mood_text(&body).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_accepts_exactly_max_length() {
        let body = json!({ "text": "x".repeat(MAX_TEXT_CHARS) });
        assert!(mood_text(&body).is_ok());
    }

    #[test]
    fn test_length_is_measured_in_characters() {
        // multibyte characters count once each
        let body = json!({ "text": "é".repeat(MAX_TEXT_CHARS) });
        assert!(mood_text(&body).is_ok());
    }

    #[test]
    fn test_untrimmed_length_counts() {
        let padded = format!("{}{}", " ".repeat(MAX_TEXT_CHARS), "a");
        let body = json!({ "text": padded });
        assert!(mood_text(&body).is_err());
    }
}
