//! Memory-size validation and parsing.

use crate::ValidateError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Positive integer plus optional K/M/G/T suffix, case-insensitive,
/// with an optional trailing B ("2gb"). sacct appends a per-node or
/// per-core marker ("4Gn", "1000Mc") which is also tolerated.
static MEM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+)\s*([kKmMgGtT]?)[bB]?[nc]?\s*$").unwrap());

/// Validate a memory spec and return the canonical form.
///
/// The canonical form is the number plus an uppercase unit letter, with
/// a bare number treated as megabytes: "2gb" becomes "2G", "4000M"
/// stays "4000M", "4096" becomes "4096M". Zero is rejected.
pub fn canonicalize_memory(raw: &str) -> Result<String, ValidateError> {
    let caps = MEM_RE
        .captures(raw)
        .ok_or_else(|| ValidateError::Memory(raw.to_string()))?;
    let value: u64 = caps[1]
        .parse()
        .map_err(|_| ValidateError::Memory(raw.to_string()))?;
    if value == 0 {
        return Err(ValidateError::ZeroMemory);
    }
    let unit = match caps[2].to_uppercase().as_str() {
        "" => "M".to_string(),
        u => u.to_string(),
    };
    Ok(format!("{}{}", value, unit))
}

/// Parse a scheduler memory string to megabytes.
///
/// Handles squeue/sacct formats: "4G", "1000M", "4096K", "4Gn",
/// "102400Kc", or a bare number (megabytes). Returns None for empty
/// strings or placeholders.
pub fn parse_memory_mb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "-" || s == "N/A" {
        return None;
    }

    let caps = MEM_RE.captures(s)?;
    let value: u64 = caps[1].parse().ok()?;
    match caps[2].to_uppercase().as_str() {
        "T" => value.checked_mul(1024 * 1024),
        "G" => value.checked_mul(1024),
        // Sub-megabyte values clamp to 1 rather than flooring to 0
        "K" => Some((value / 1024).max(1)),
        // Bare number or M suffix is megabytes
        _ => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_memory() {
        assert_eq!(canonicalize_memory("2gb").unwrap(), "2G");
        assert_eq!(canonicalize_memory("4000M").unwrap(), "4000M");
        assert_eq!(canonicalize_memory("4096").unwrap(), "4096M");
        assert_eq!(canonicalize_memory("1T").unwrap(), "1T");
        assert_eq!(canonicalize_memory("512k").unwrap(), "512K");
    }

    #[test]
    fn test_canonicalize_memory_rejects() {
        assert_eq!(canonicalize_memory("0"), Err(ValidateError::ZeroMemory));
        assert!(canonicalize_memory("-4G").is_err());
        assert!(canonicalize_memory("4X").is_err());
        assert!(canonicalize_memory("").is_err());
        assert!(canonicalize_memory("lots").is_err());
    }

    #[test]
    fn test_canonicalize_idempotent() {
        for spec in ["2gb", "4000M", "4096", "1T"] {
            let canonical = canonicalize_memory(spec).unwrap();
            assert_eq!(canonicalize_memory(&canonical).unwrap(), canonical);
        }
    }

    #[test]
    fn test_parse_memory_mb() {
        assert_eq!(parse_memory_mb("4G"), Some(4096));
        assert_eq!(parse_memory_mb("1000M"), Some(1000));
        assert_eq!(parse_memory_mb("4096K"), Some(4));
        assert_eq!(parse_memory_mb("4096"), Some(4096));
        assert_eq!(parse_memory_mb("4Gn"), Some(4096));
        assert_eq!(parse_memory_mb("1000Mc"), Some(1000));
        assert_eq!(parse_memory_mb(""), None);
        assert_eq!(parse_memory_mb("-"), None);
    }

    #[test]
    fn test_parse_memory_mb_sub_megabyte_clamps_to_one() {
        assert_eq!(parse_memory_mb("512K"), Some(1));
        assert_eq!(parse_memory_mb("1K"), Some(1));
        assert_eq!(parse_memory_mb("2048K"), Some(2));
    }

    #[test]
    fn test_parse_memory_mb_overflow_is_none() {
        assert_eq!(parse_memory_mb("18446744073709551615T"), None);
        assert_eq!(parse_memory_mb("18446744073709551615G"), None);
    }
}
