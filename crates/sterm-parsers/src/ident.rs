//! Identifier and resource-string validators.
//!
//! The character sets mirror what Slurm itself accepts for job ids,
//! names, and sbatch flags. Shell metacharacters are rejected even
//! though no validated value ever reaches a shell.

use crate::ValidateError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Numeric job id, optionally with an array-index suffix (e.g. "12345_7").
static JOB_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(_\d+)?$").unwrap());

/// Job and template names: alphanumeric start, then a small punctuation
/// allowlist. No path separators, no shell metacharacters.
static JOB_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.@:+-]*$").unwrap());

/// sbatch/srun parameter keys (long-option names).
static PARAM_KEY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_-]*$").unwrap());

/// Filter values passed to squeue/sacct (user names, time windows).
static FILTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_.@:,+-]+$").unwrap());

/// GPU spec: bare count or "type:count" where type is a GRES token.
static GPU_SPEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9_]*:)?[1-9][0-9]*$").unwrap());

const MAX_NAME_LEN: usize = 200;

/// Validate a Slurm job id (numeric, optional array suffix).
pub fn validate_job_id(raw: &str) -> Result<String, ValidateError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ValidateError::Empty);
    }
    if !JOB_ID_RE.is_match(id) {
        return Err(ValidateError::BadCharacters {
            what: "job id",
            input: raw.to_string(),
        });
    }
    Ok(id.to_string())
}

/// Validate a job name, returning the trimmed form.
pub fn validate_job_name(raw: &str) -> Result<String, ValidateError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidateError::Empty);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidateError::TooLong { max: MAX_NAME_LEN });
    }
    if !JOB_NAME_RE.is_match(name) {
        return Err(ValidateError::BadCharacters {
            what: "job name",
            input: raw.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Validate an sbatch/srun parameter key (the long-option name).
pub fn validate_param_key(raw: &str) -> Result<String, ValidateError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(ValidateError::Empty);
    }
    if !PARAM_KEY_RE.is_match(key) {
        return Err(ValidateError::BadCharacters {
            what: "parameter key",
            input: raw.to_string(),
        });
    }
    Ok(key.to_string())
}

/// Reject parameter values containing NUL bytes or line breaks.
/// Values are passed as single argv elements, so anything else is allowed.
pub fn validate_param_value(raw: &str) -> Result<String, ValidateError> {
    if raw.contains('\0') || raw.contains('\n') || raw.contains('\r') {
        return Err(ValidateError::ControlCharacters);
    }
    Ok(raw.to_string())
}

/// Validate a filter value passed to squeue/sacct (-u, -S, -t).
pub fn validate_filter(raw: &str) -> Result<String, ValidateError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidateError::Empty);
    }
    if !FILTER_RE.is_match(value) {
        return Err(ValidateError::BadCharacters {
            what: "filter value",
            input: raw.to_string(),
        });
    }
    Ok(value.to_string())
}

/// Validate a GPU/GRES spec like "1" or "a100:2".
/// Returns the canonical lowercase form.
pub fn validate_gpu_spec(raw: &str) -> Result<String, ValidateError> {
    let spec = raw.trim();
    if spec.is_empty() {
        return Err(ValidateError::Empty);
    }
    if !GPU_SPEC_RE.is_match(spec) {
        return Err(ValidateError::Gpu(raw.to_string()));
    }
    Ok(spec.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id() {
        assert_eq!(validate_job_id("12345").unwrap(), "12345");
        assert_eq!(validate_job_id("12345_7").unwrap(), "12345_7");
        assert_eq!(validate_job_id(" 42 ").unwrap(), "42");
        assert!(validate_job_id("").is_err());
        assert!(validate_job_id("12345_").is_err());
        assert!(validate_job_id("abc").is_err());
        assert!(validate_job_id("123;rm -rf /").is_err());
    }

    #[test]
    fn test_job_name_rejects_shell_metacharacters() {
        for bad in ["a;b", "a|b", "a&b", "a`b`", "a$(b)", "a b", "a'b", "a\"b"] {
            assert!(validate_job_name(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_job_name_rejects_path_separators() {
        assert!(validate_job_name("a/b").is_err());
        assert!(validate_job_name("a\\b").is_err());
        assert!(validate_job_name("../escape").is_err());
    }

    #[test]
    fn test_job_name_accepts_allowlist() {
        assert_eq!(validate_job_name("train_resnet50").unwrap(), "train_resnet50");
        assert_eq!(validate_job_name("run.v2:a+b@c").unwrap(), "run.v2:a+b@c");
        assert!(validate_job_name("").is_err());
        assert!(validate_job_name(&"x".repeat(201)).is_err());
    }

    #[test]
    fn test_param_key() {
        assert!(validate_param_key("cpus-per-task").is_ok());
        assert!(validate_param_key("mem").is_ok());
        assert!(validate_param_key("1bad").is_err());
        assert!(validate_param_key("a=b").is_err());
    }

    #[test]
    fn test_param_value() {
        assert!(validate_param_value("4G").is_ok());
        assert!(validate_param_value("a b c").is_ok());
        assert!(validate_param_value("a\nb").is_err());
        assert!(validate_param_value("a\0b").is_err());
    }

    #[test]
    fn test_filter() {
        assert!(validate_filter("alice").is_ok());
        assert!(validate_filter("now-7days").is_ok());
        assert!(validate_filter("PENDING,RUNNING").is_ok());
        assert!(validate_filter("alice;id").is_err());
        assert!(validate_filter("").is_err());
    }

    #[test]
    fn test_gpu_spec() {
        assert_eq!(validate_gpu_spec("1").unwrap(), "1");
        assert_eq!(validate_gpu_spec("a100:2").unwrap(), "a100:2");
        assert_eq!(validate_gpu_spec("A100:2").unwrap(), "a100:2");
        assert!(validate_gpu_spec("0").is_err());
        assert!(validate_gpu_spec("a100:").is_err());
        assert!(validate_gpu_spec(":2").is_err());
        assert!(validate_gpu_spec("a100:2:3").is_err());
    }
}
