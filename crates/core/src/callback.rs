//! Interpretation of worker callback payloads.
//!
//! Workers report results with heterogeneous key names. Each output attribute
//! has an ordered list of candidate paths into the `result` object; the first
//! candidate holding a non-empty string wins, otherwise a fixed default
//! applies.

use serde_json::Value;

use crate::article::{ArticleInput, ArticleOutput};

/// Title used when the worker supplies none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Error text used when a failure callback carries no message.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Unknown error occurred";

/// A JSON path into the worker's `result` object.
type Candidate = &'static [&'static str];

const ORIGINAL_TOPIC: &[Candidate] = &[&["original_topic"]];
const ORIGINAL_KEYWORDS: &[Candidate] = &[&["original_keywords"]];
const REFINED_TITLE: &[Candidate] = &[&["refined_title"], &["new_title"]];
const SEO_TITLE: &[Candidate] = &[&["seo_title"], &["metadata", "seo_title"]];
const SEO_DESCRIPTION: &[Candidate] = &[
    &["seo_description"],
    &["metadata", "meta_description"],
    &["description"],
];
const IMAGE_URL: &[Candidate] = &[&["image_url"], &["metadata", "image_url"], &["image"]];
const DOC_LINK: &[Candidate] = &[&["doc_link"], &["document_link"]];

/// Status values a worker may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportedStatus {
    Completed,
    Failed,
}

impl ReportedStatus {
    /// Parse the worker's `status` field. Anything but the two terminal
    /// names is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "completed" => Some(ReportedStatus::Completed),
            "failed" => Some(ReportedStatus::Failed),
            _ => None,
        }
    }
}

fn lookup<'a>(result: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(result, |node, key| node.get(key))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn first_match(result: &Value, candidates: &[Candidate]) -> Option<String> {
    candidates
        .iter()
        .find_map(|path| lookup(result, path))
        .map(str::to_string)
}

/// Build the stored output record from a worker `result` object.
pub fn build_output(result: &Value, input: &ArticleInput) -> ArticleOutput {
    ArticleOutput {
        original_topic: first_match(result, ORIGINAL_TOPIC)
            .unwrap_or_else(|| input.topic.clone()),
        original_keywords: first_match(result, ORIGINAL_KEYWORDS)
            .or_else(|| input.keywords.clone())
            .unwrap_or_default(),
        refined_title: first_match(result, REFINED_TITLE)
            .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        seo_title: first_match(result, SEO_TITLE).unwrap_or_default(),
        seo_description: first_match(result, SEO_DESCRIPTION).unwrap_or_default(),
        image_url: first_match(result, IMAGE_URL).unwrap_or_default(),
        doc_link: first_match(result, DOC_LINK).unwrap_or_default(),
    }
}

/// Error message for a failure callback.
pub fn failure_message(error: Option<&str>) -> String {
    error
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_FAILURE_MESSAGE)
        .to_string()
}
