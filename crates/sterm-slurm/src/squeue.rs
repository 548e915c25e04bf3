//! Parse active jobs from squeue output.

use crate::types::{CommandFamily, Job, JobState, ParseWarning};
use camino::Utf8PathBuf;
use sterm_parsers::{non_empty_string, parse_memory_mb, parse_slurm_timestamp, split_delimited};

/// squeue output format:
/// %A - Job ID
/// %j - Job name
/// %T - State (extended)
/// %P - Partition
/// %u - User
/// %V - Submit time
/// %S - Start time
/// %Z - Working directory
/// %D - Node count
/// %C - CPUs
/// %m - Memory
/// %b - GRES
/// %N - Nodelist
/// %r - Reason
pub const SQUEUE_FORMAT: &str = "%A|%j|%T|%P|%u|%V|%S|%Z|%D|%C|%m|%b|%N|%r";

const FIELD_COUNT: usize = 14;

/// Parse one squeue record line.
fn parse_line(line: &str) -> Result<Job, String> {
    let fields = split_delimited(line, FIELD_COUNT)?;

    let job_id = fields[0].trim();
    if job_id.is_empty() {
        return Err("missing job id".to_string());
    }
    let name = fields[1].trim();
    if name.is_empty() {
        return Err("missing job name".to_string());
    }

    // Node and CPU counts are required numerics; a record that cannot
    // report them is dropped rather than guessed at.
    let node_count: u32 = fields[8]
        .trim()
        .parse()
        .map_err(|_| format!("bad node count {:?}", fields[8]))?;
    let cpus: u32 = fields[9]
        .trim()
        .parse()
        .map_err(|_| format!("bad cpu count {:?}", fields[9]))?;

    let template = Job::default_output_template(job_id).to_string();

    Ok(Job {
        job_id: job_id.to_string(),
        name: name.to_string(),
        state: JobState::parse(fields[2]),
        partition: non_empty_string(fields[3]),
        user: non_empty_string(fields[4]),
        submit_time: parse_slurm_timestamp(fields[5]),
        start_time: parse_slurm_timestamp(fields[6]),
        work_dir: non_empty_string(fields[7]).map(Utf8PathBuf::from),
        node_count,
        cpus,
        mem_mb: parse_memory_mb(fields[10]),
        gres: non_empty_string(fields[11]),
        nodelist: non_empty_string(fields[12]),
        reason: non_empty_string(fields[13]).filter(|r| r != "None"),
        stderr_template: template.clone(),
        stdout_template: template,
    })
}

/// Parse full squeue output into jobs plus per-record warnings.
///
/// A malformed record is dropped with a warning; the remaining records
/// are unaffected.
pub fn parse_squeue_output(stdout: &str) -> (Vec<Job>, Vec<ParseWarning>) {
    let mut jobs = Vec::new();
    let mut warnings = Vec::new();

    for line in stdout.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(job) => jobs.push(job),
            Err(reason) => warnings.push(ParseWarning::new(CommandFamily::Queue, line, reason)),
        }
    }

    (jobs, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_LINE: &str = "12345|train_resnet50|RUNNING|gpu|alice|2024-01-15T10:00:00|2024-01-15T10:05:00|/scratch/alice|1|4|32G|gpu:a100:1|node01|None";

    #[test]
    fn test_parse_line() {
        let job = parse_line(GOOD_LINE).unwrap();
        assert_eq!(job.job_id, "12345");
        assert_eq!(job.name, "train_resnet50");
        assert_eq!(job.state, JobState::Running);
        assert_eq!(job.partition.as_deref(), Some("gpu"));
        assert_eq!(job.user.as_deref(), Some("alice"));
        assert_eq!(job.cpus, 4);
        assert_eq!(job.node_count, 1);
        assert_eq!(job.mem_mb, Some(32 * 1024));
        assert_eq!(job.gres.as_deref(), Some("gpu:a100:1"));
        assert_eq!(job.nodelist.as_deref(), Some("node01"));
        assert!(job.reason.is_none());
        assert_eq!(job.stdout_template, "slurm-%j.out");
    }

    #[test]
    fn test_pending_job_has_empty_optionals() {
        let line = "99|queued_job|PENDING|batch|bob|2024-01-15T10:00:00|N/A||2|16|64G|||Resources";
        let job = parse_line(line).unwrap();
        assert_eq!(job.state, JobState::Pending);
        assert!(job.start_time.is_none());
        assert!(job.nodelist.is_none());
        assert_eq!(job.reason.as_deref(), Some("Resources"));
    }

    #[test]
    fn test_unknown_state_kept_as_unknown() {
        let output = format!(
            "{}\n50|other|FUTURE_STATE|batch|bob|2024-01-15T09:00:00|N/A|/home/bob|1|1|1G||node02|None\n",
            GOOD_LINE
        );
        let (jobs, warnings) = parse_squeue_output(&output);
        assert_eq!(jobs.len(), 2);
        assert!(warnings.is_empty());
        assert_eq!(
            jobs[1].state,
            JobState::Unknown("FUTURE_STATE".to_string())
        );
        // Neighbors are untouched
        assert_eq!(jobs[0].state, JobState::Running);
    }

    #[test]
    fn test_missing_id_drops_record_with_warning() {
        let output = format!(
            "{}\n|noid|RUNNING|batch|bob|2024-01-15T09:00:00|N/A|/home/bob|1|1|1G||node02|None\n{}",
            GOOD_LINE,
            GOOD_LINE.replace("12345", "12346")
        );
        let (jobs, warnings) = parse_squeue_output(&output);
        assert_eq!(jobs.len(), 2);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].reason.contains("missing job id"));
    }

    #[test]
    fn test_bad_cpu_count_drops_record() {
        let line = GOOD_LINE.replace("|4|", "|many|");
        let (jobs, warnings) = parse_squeue_output(&line);
        assert!(jobs.is_empty());
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_array_job_template() {
        let line = GOOD_LINE.replace("12345", "12345_3");
        let job = parse_line(&line).unwrap();
        assert_eq!(job.stdout_template, "slurm-%A_%a.out");
    }
}
