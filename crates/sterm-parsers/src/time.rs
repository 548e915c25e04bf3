//! Time-spec validation and duration/timestamp parsing.

use crate::ValidateError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::time::Duration;

/// Parse a Slurm time specification and return total seconds.
///
/// Accepted formats (the same set sbatch accepts for `--time`):
/// - `M` (bare number = minutes)
/// - `MM:SS`
/// - `HH:MM:SS`
/// - `D-HH:MM:SS`
///
/// Minute and second components must be below 60.
pub fn parse_time_spec(raw: &str) -> Result<u64, ValidateError> {
    let spec = raw.trim();
    if spec.is_empty() {
        return Err(ValidateError::Empty);
    }

    let (days, rest) = match spec.split_once('-') {
        Some((day_part, rest)) => {
            let days: u64 = day_part
                .parse()
                .map_err(|_| ValidateError::Time(raw.to_string()))?;
            (days, rest)
        }
        None => (0, spec),
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let nums: Vec<u64> = parts
        .iter()
        .map(|p| p.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| ValidateError::Time(raw.to_string()))?;

    // Checked arithmetic throughout: day and hour counts come straight
    // from user input and can overflow u64.
    let overflow = || ValidateError::Time(raw.to_string());
    let seconds = match nums.as_slice() {
        // Bare number is minutes, per sbatch --time
        [m] => {
            if days > 0 {
                return Err(ValidateError::Time(raw.to_string()));
            }
            m.checked_mul(60).ok_or_else(overflow)?
        }
        [m, s] => {
            if *m >= 60 || *s >= 60 {
                return Err(ValidateError::TimeComponent(raw.to_string()));
            }
            m * 60 + s
        }
        [h, m, s] => {
            if *m >= 60 || *s >= 60 {
                return Err(ValidateError::TimeComponent(raw.to_string()));
            }
            h.checked_mul(3600)
                .and_then(|v| v.checked_add(m * 60 + s))
                .ok_or_else(overflow)?
        }
        _ => return Err(ValidateError::Time(raw.to_string())),
    };

    days.checked_mul(86400)
        .and_then(|d| d.checked_add(seconds))
        .ok_or_else(overflow)
}

/// Format seconds as the canonical time spec: `HH:MM:SS`, or
/// `D-HH:MM:SS` when the duration spans a day or more.
pub fn format_time(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if days > 0 {
        format!("{}-{:02}:{:02}:{:02}", days, hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs)
    }
}

/// Validate a time spec and return its canonical form.
///
/// Canonicalization is idempotent: feeding the result back through
/// produces the same string.
pub fn canonicalize_time_spec(raw: &str) -> Result<String, ValidateError> {
    parse_time_spec(raw).map(format_time)
}

/// Parse a Slurm timestamp (YYYY-MM-DDTHH:MM:SS or placeholder values).
///
/// Returns None for empty strings or placeholders like "N/A", "Unknown", "None".
pub fn parse_slurm_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() || s == "N/A" || s == "Unknown" || s == "None" {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .and_then(|dt| Utc.from_local_datetime(&dt).single())
}

/// Parse a duration from scheduler output.
///
/// Supports D-HH:MM:SS, HH:MM:SS, MM:SS, and bare seconds. Fractional
/// seconds (sacct TotalCPU prints "MM:SS.mmm") are truncated.
/// Returns None for "UNLIMITED", placeholders, or empty strings.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() || s == "UNLIMITED" || s == "-" || s == "N/A" {
        return None;
    }

    let parts: Vec<&str> = s.split('-').collect();
    let (days, time_part) = if parts.len() == 2 {
        (parts[0].parse::<u64>().ok()?, parts[1])
    } else {
        (0, parts[0])
    };

    // Drop fractional seconds before splitting
    let time_part = time_part.split('.').next().unwrap_or(time_part);

    let time_parts: Vec<u64> = time_part
        .split(':')
        .map(|p| p.parse())
        .collect::<Result<_, _>>()
        .ok()?;

    let seconds = match time_parts.len() {
        3 => time_parts[0]
            .checked_mul(3600)?
            .checked_add(time_parts[1].checked_mul(60)?)?
            .checked_add(time_parts[2])?,
        2 => time_parts[0].checked_mul(60)?.checked_add(time_parts[1])?,
        1 => time_parts[0],
        _ => return None,
    };

    days.checked_mul(86400)?
        .checked_add(seconds)
        .map(Duration::from_secs)
}

/// Exit status of a completed job, distinguishing normal exits from
/// signal-terminated ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Exited(i32),
    Signaled(i32),
}

/// Parse a sacct ExitCode field ("exit:signal").
///
/// A nonzero signal component means the job was signal-terminated.
pub fn parse_exit_status(s: &str) -> ExitStatus {
    let mut parts = s.split(':');
    let code: i32 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    let signal: i32 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0);
    if signal != 0 {
        ExitStatus::Signaled(signal)
    } else {
        ExitStatus::Exited(code)
    }
}
