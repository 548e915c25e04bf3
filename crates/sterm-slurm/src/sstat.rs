//! Parse live resource usage from sstat.

use crate::types::LiveStats;
use sterm_parsers::{parse_duration, parse_memory_mb};

/// sstat output format (-P pipe-delimited, -n no header).
pub const SSTAT_FORMAT: &str = "AveCPU,MaxRSS,MaxVMSize";

/// Parse sstat output into live usage figures.
///
/// sstat prints an all-empty row for steps it has no data for; the
/// first row with any content wins. Returns None when no row carries
/// data, which callers treat as "try the next step suffix".
pub fn parse_sstat_output(stdout: &str) -> Option<LiveStats> {
    for line in stdout.lines() {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() < 3 {
            continue;
        }
        if fields[..3].iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        return Some(LiveStats {
            ave_cpu: parse_duration(fields[0]),
            max_rss_mb: parse_memory_mb(fields[1]),
            max_vmsize_mb: parse_memory_mb(fields[2]),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_running_job() {
        let stats = parse_sstat_output("00:05:23|102400K|2048000K\n").unwrap();
        assert_eq!(stats.ave_cpu, Some(Duration::from_secs(5 * 60 + 23)));
        assert_eq!(stats.max_rss_mb, Some(100));
        assert_eq!(stats.max_vmsize_mb, Some(2000));
    }

    #[test]
    fn test_empty_rows_yield_none() {
        assert!(parse_sstat_output("").is_none());
        assert!(parse_sstat_output("||\n").is_none());
        assert!(parse_sstat_output(" | | \n").is_none());
    }

    #[test]
    fn test_first_populated_row_wins() {
        let stats = parse_sstat_output("||\n00:01:00|512M|1G\n").unwrap();
        assert_eq!(stats.max_rss_mb, Some(512));
        assert_eq!(stats.max_vmsize_mb, Some(1024));
    }

    #[test]
    fn test_partial_row_keeps_known_fields() {
        let stats = parse_sstat_output("00:01:00||\n").unwrap();
        assert_eq!(stats.ave_cpu, Some(Duration::from_secs(60)));
        assert!(stats.max_rss_mb.is_none());
    }
}
