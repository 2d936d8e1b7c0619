//! Keyword extraction from completed assistant responses.
//!
//! The model is instructed to end its prose with a double-bracketed,
//! comma-separated keyword list (`[[kw1, kw2, ...]]`). This module
//! scans a completed response for the first such span and returns the
//! trimmed keywords in order. Keyword content is not validated.

use regex::Regex;
use std::sync::LazyLock;

// Non-greedy so a second span never extends the match.
static KEYWORD_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").unwrap());

/// Extract the keyword list from a completed response.
///
/// Only the first `[[...]]` span is considered. Pieces are split on
/// commas and whitespace-trimmed; blank pieces are dropped. Returns an
/// empty vec when no span exists or every piece is blank.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let Some(captures) = KEYWORD_SPAN.captures(text) else {
        return Vec::new();
    };

    captures[1]
        .split(',')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(str::to_string)
        .collect()
}
