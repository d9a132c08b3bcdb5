//! Value extraction from response bodies.
//!
//! Actions scrape tokens and ids out of HTML and JSON responses with regular
//! expressions and pass them on to the next request.

use regex::Regex;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during value extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Regex compilation failed: {0}")]
    RegexError(#[from] regex::Error),

    #[error("{0}")]
    Empty(String),
}

/// Capture group `group` of the first match of `pattern` in `text`.
///
/// `Ok(None)` when the pattern does not match or the group did not take part
/// in the match.
///
/// # Example
/// ```
/// use dc_loadtest::extractor::fetch_by_re;
///
/// let html = r#"<meta id="atlassian-token" name="atlassian-token" content="abc123">"#;
/// let token = fetch_by_re(r#"name="atlassian-token" content="(.+?)""#, html, 1).unwrap();
/// assert_eq!(token.as_deref(), Some("abc123"));
/// ```
pub fn fetch_by_re(pattern: &str, text: &str, group: usize) -> Result<Option<String>, ExtractionError> {
    let re = Regex::new(pattern)?;

    let value = re
        .captures(text)
        .and_then(|captures| captures.get(group))
        .map(|m| m.as_str().to_string());

    if value.is_none() {
        debug!(pattern = pattern, group = group, "Pattern did not match");
    }

    Ok(value)
}

/// Like [`fetch_by_re`], falling back to `default` when nothing matched.
pub fn fetch_by_re_or(
    pattern: &str,
    text: &str,
    group: usize,
    default: &str,
) -> Result<String, ExtractionError> {
    Ok(fetch_by_re(pattern, text, group)?.unwrap_or_else(|| default.to_string()))
}

/// Capture group 1 of every match of `pattern`, in order.
pub fn fetch_all_by_re(pattern: &str, text: &str) -> Result<Vec<String>, ExtractionError> {
    let re = Regex::new(pattern)?;
    Ok(re
        .captures_iter(text)
        .filter_map(|captures| captures.get(1).map(|m| m.as_str().to_string()))
        .collect())
}

/// First element of `items`, or an error carrying `err`.
pub fn get_first_index<'a, T>(items: &'a [T], err: &str) -> Result<&'a T, ExtractionError> {
    items.first().ok_or_else(|| ExtractionError::Empty(err.to_string()))
}
