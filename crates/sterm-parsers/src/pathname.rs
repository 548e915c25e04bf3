//! Path-fragment validation for names that become file names.

use crate::ValidateError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Safe file stems: alphanumeric start, then letters, digits,
/// underscores, hyphens, dots, and spaces. The dot is allowed but
/// ".." is rejected separately below.
static SAFE_STEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_. -]*$").unwrap());

const MAX_STEM_LEN: usize = 100;

/// Validate a name that will be used as a file stem (template names,
/// log-path placeholders). Rejects empty input, traversal segments,
/// absolute-path escapes, and embedded separators.
pub fn validate_file_stem(raw: &str) -> Result<String, ValidateError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidateError::Empty);
    }
    if name.len() > MAX_STEM_LEN {
        return Err(ValidateError::TooLong { max: MAX_STEM_LEN });
    }
    if name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(ValidateError::UnsafePath(raw.to_string()));
    }
    if !SAFE_STEM_RE.is_match(name) {
        return Err(ValidateError::UnsafePath(raw.to_string()));
    }
    Ok(name.to_string())
}
