//! Input validation and shared parsing utilities for sterm.
//!
//! Validators take a raw user string and return a normalized value or a
//! [`ValidateError`]; they never execute commands or touch state. The
//! parse helpers are shared by the command-output parsers in sterm-slurm.

pub mod ident;
pub mod memory;
pub mod pathname;
pub mod time;

use thiserror::Error;

pub use ident::{
    validate_filter, validate_gpu_spec, validate_job_id, validate_job_name, validate_param_key,
    validate_param_value,
};
pub use memory::{canonicalize_memory, parse_memory_mb};
pub use pathname::validate_file_stem;
pub use time::{
    canonicalize_time_spec, format_time, parse_duration, parse_exit_status, parse_slurm_timestamp,
    parse_time_spec, ExitStatus,
};

/// Validation failure kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidateError {
    #[error("value must not be empty")]
    Empty,
    #[error("value too long (max {max} characters)")]
    TooLong { max: usize },
    #[error("invalid {what}: {input:?}")]
    BadCharacters { what: &'static str, input: String },
    #[error("value contains control characters")]
    ControlCharacters,
    #[error("invalid time specification: {0:?}")]
    Time(String),
    #[error("time component out of range in {0:?}")]
    TimeComponent(String),
    #[error("invalid memory specification: {0:?}")]
    Memory(String),
    #[error("memory must be greater than zero")]
    ZeroMemory,
    #[error("invalid GPU specification: {0:?} (expected e.g. \"1\" or \"a100:2\")")]
    Gpu(String),
    #[error("unsafe path segment: {0:?}")]
    UnsafePath(String),
}

/// Filter helper for optional string fields.
/// Returns None if the string is empty or a placeholder value.
pub fn non_empty_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed == "-" || trimmed == "N/A" || trimmed == "Unknown" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Split a pipe-delimited line and validate field count.
pub fn split_delimited(line: &str, min_fields: usize) -> Result<Vec<&str>, String> {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < min_fields {
        return Err(format!(
            "expected {} fields, got {}: {}",
            min_fields,
            fields.len(),
            line
        ));
    }
    Ok(fields)
}
