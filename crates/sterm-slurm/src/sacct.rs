//! Parse completed-job accounting records from sacct.

use crate::types::{CommandFamily, HistoryRecord, JobState, ParseWarning};
use sterm_parsers::{
    non_empty_string, parse_duration, parse_exit_status, parse_memory_mb, split_delimited,
};

/// sacct output format (-P uses | delimiter, -n drops the header,
/// -X keeps only the main job line, no sub-steps).
pub const SACCT_FORMAT: &str = "JobID,JobName,Partition,State,Elapsed,TotalCPU,MaxRSS,ExitCode";

const FIELD_COUNT: usize = 8;

fn parse_line(line: &str) -> Result<HistoryRecord, String> {
    let fields = split_delimited(line, FIELD_COUNT)?;

    let job_id = fields[0].trim();
    if job_id.is_empty() {
        return Err("missing job id".to_string());
    }
    let name = fields[1].trim();
    if name.is_empty() {
        return Err("missing job name".to_string());
    }

    Ok(HistoryRecord {
        job_id: job_id.to_string(),
        name: name.to_string(),
        partition: non_empty_string(fields[2]),
        state: JobState::parse(fields[3]),
        elapsed: parse_duration(fields[4]),
        cpu_time: parse_duration(fields[5]),
        max_rss_mb: parse_memory_mb(fields[6]),
        exit: parse_exit_status(fields[7]),
    })
}

/// Parse full sacct output.
///
/// Sub-step rows ("12345.batch", "12345.extern") are skipped; only the
/// main job record per id is kept. Malformed records are dropped with
/// a warning.
pub fn parse_sacct_output(stdout: &str) -> (Vec<HistoryRecord>, Vec<ParseWarning>) {
    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        // Skip sub-steps, keep only main jobs
        if line.split('|').next().is_some_and(|id| id.contains('.')) {
            continue;
        }
        match parse_line(line) {
            Ok(record) => records.push(record),
            Err(reason) => warnings.push(ParseWarning::new(CommandFamily::History, line, reason)),
        }
    }

    (records, warnings)
}
