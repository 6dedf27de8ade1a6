//! Article generation input and output payloads.
//!
//! [`ArticleInput`] is frozen at submission time; [`normalize_input`] is the
//! only way to build one from client data. [`ArticleOutput`] is produced by
//! the callback reconciler (see [`crate::callback::build_output`]) or by an
//! owner-initiated content edit.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Word limit applied when the client omits one or sends a non-positive value.
pub const DEFAULT_WORD_LIMIT: i32 = 1000;

/// Upper bound on requested article length.
pub const MAX_WORD_LIMIT: i32 = 10_000;

/// Maximum topic length in characters (after trimming).
pub const MAX_TOPIC_LENGTH: usize = 500;

/// Maximum keyword string length in characters (after trimming).
pub const MAX_KEYWORDS_LENGTH: usize = 1000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Normalized, immutable job input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleInput {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    pub word_limit: i32,
}

/// Generated article metadata stored on a completed job.
///
/// Optional attributes are empty strings rather than absent so the record
/// shape is stable for clients.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleOutput {
    pub original_topic: String,
    #[serde(default)]
    pub original_keywords: String,
    pub refined_title: String,
    #[serde(default)]
    pub seo_title: String,
    #[serde(default)]
    pub seo_description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub doc_link: String,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Validate and normalize raw submission fields.
///
/// * `topic` is trimmed and must be non-empty.
/// * `keywords` is trimmed; an empty string becomes `None`.
/// * `word_limit` falls back to `default_word_limit` when absent or `<= 0`.
pub fn normalize_input(
    topic: Option<&str>,
    keywords: Option<&str>,
    word_limit: Option<i64>,
    default_word_limit: i32,
) -> Result<ArticleInput, CoreError> {
    let topic = topic.map(str::trim).unwrap_or_default();
    if topic.is_empty() {
        return Err(CoreError::Validation("Topic is required".into()));
    }
    if topic.chars().count() > MAX_TOPIC_LENGTH {
        return Err(CoreError::Validation(format!(
            "Topic must be at most {MAX_TOPIC_LENGTH} characters"
        )));
    }

    let keywords = keywords.map(str::trim).filter(|k| !k.is_empty());
    if let Some(k) = keywords {
        if k.chars().count() > MAX_KEYWORDS_LENGTH {
            return Err(CoreError::Validation(format!(
                "Keywords must be at most {MAX_KEYWORDS_LENGTH} characters"
            )));
        }
    }

    let word_limit = match word_limit {
        Some(n) if n > 0 => {
            if n > i64::from(MAX_WORD_LIMIT) {
                return Err(CoreError::Validation(format!(
                    "Word limit must be at most {MAX_WORD_LIMIT}"
                )));
            }
            n as i32
        }
        _ => default_word_limit,
    };

    Ok(ArticleInput {
        topic: topic.to_string(),
        keywords: keywords.map(str::to_string),
        word_limit,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn zero_word_limit_uses_default() {
        let input = normalize_input(Some("A"), Some("b,c"), Some(0), DEFAULT_WORD_LIMIT).unwrap();
        assert_eq!(input.topic, "A");
        assert_eq!(input.keywords.as_deref(), Some("b,c"));
        assert_eq!(input.word_limit, 1000);
    }

    #[test]
    fn missing_and_negative_word_limit_use_default() {
        let missing = normalize_input(Some("A"), None, None, 750).unwrap();
        assert_eq!(missing.word_limit, 750);
        let negative = normalize_input(Some("A"), None, Some(-20), 750).unwrap();
        assert_eq!(negative.word_limit, 750);
    }

    #[test]
    fn explicit_word_limit_is_kept() {
        let input = normalize_input(Some("A"), None, Some(2500), DEFAULT_WORD_LIMIT).unwrap();
        assert_eq!(input.word_limit, 2500);
    }

    #[test]
    fn oversized_word_limit_is_rejected() {
        let result = normalize_input(Some("A"), None, Some(50_000), DEFAULT_WORD_LIMIT);
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn topic_is_trimmed_and_required() {
        let input = normalize_input(Some("  Rust  "), None, None, DEFAULT_WORD_LIMIT).unwrap();
        assert_eq!(input.topic, "Rust");

        assert_matches!(
            normalize_input(Some("   "), None, None, DEFAULT_WORD_LIMIT),
            Err(CoreError::Validation(msg)) if msg == "Topic is required"
        );
        assert_matches!(
            normalize_input(None, None, None, DEFAULT_WORD_LIMIT),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn blank_keywords_become_none() {
        let input = normalize_input(Some("A"), Some("  "), None, DEFAULT_WORD_LIMIT).unwrap();
        assert_eq!(input.keywords, None);
    }

    #[test]
    fn overlong_topic_is_rejected() {
        let topic = "x".repeat(MAX_TOPIC_LENGTH + 1);
        assert_matches!(
            normalize_input(Some(&topic), None, None, DEFAULT_WORD_LIMIT),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn output_deserializes_with_missing_optional_fields() {
        let output: ArticleOutput = serde_json::from_value(serde_json::json!({
            "original_topic": "A",
            "refined_title": "Edited",
        }))
        .unwrap();
        assert_eq!(output.refined_title, "Edited");
        assert_eq!(output.seo_title, "");
    }
}
