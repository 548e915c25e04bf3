//! Parse one job's record from `scontrol show job <id>`.
//!
//! Same key=value token convention as the node records, with one
//! wrinkle: path-bearing keys (Command, WorkDir, StdOut, StdErr) sit
//! alone on their line and their value runs to the end of the line, so
//! paths with spaces survive.

use crate::types::{JobDetail, JobState};
use camino::Utf8PathBuf;
use std::collections::HashMap;
use sterm_parsers::{
    non_empty_string, parse_duration, parse_exit_status, parse_memory_mb, parse_slurm_timestamp,
};

const LINE_KEYS: &[&str] = &["Command", "WorkDir", "StdOut", "StdErr", "StdIn"];

fn path_field(fields: &HashMap<&str, &str>, key: &str) -> Option<Utf8PathBuf> {
    fields
        .get(key)
        .and_then(|v| non_empty_string(v))
        .filter(|v| v != "(null)" && v != "/dev/null")
        .map(Utf8PathBuf::from)
}

/// Parse `scontrol show job` output into a [`JobDetail`].
pub fn parse_job_detail(stdout: &str) -> Result<JobDetail, String> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in stdout.lines() {
        let line = line.trim();
        if let Some((key, value)) = line.split_once('=') {
            if LINE_KEYS.contains(&key) {
                fields.insert(key, value);
                continue;
            }
        }
        for token in line.split_whitespace() {
            if let Some((key, value)) = token.split_once('=') {
                fields.insert(key, value);
            }
        }
    }

    let job_id = fields
        .get("JobId")
        .filter(|v| !v.is_empty())
        .ok_or("missing JobId")?;
    let name = fields
        .get("JobName")
        .filter(|v| !v.is_empty())
        .ok_or("missing JobName")?;

    Ok(JobDetail {
        job_id: job_id.to_string(),
        name: name.to_string(),
        state: fields
            .get("JobState")
            .map(|v| JobState::parse(v))
            .unwrap_or(JobState::Unknown("UNKNOWN".to_string())),
        // UserId prints as "alice(1000)"; the uid is noise here
        user: fields
            .get("UserId")
            .map(|v| v.split('(').next().unwrap_or(""))
            .and_then(non_empty_string),
        partition: fields.get("Partition").and_then(|v| non_empty_string(v)),
        reason: fields
            .get("Reason")
            .and_then(|v| non_empty_string(v))
            .filter(|r| r != "None"),
        run_time: fields.get("RunTime").and_then(|v| parse_duration(v)),
        time_limit: fields.get("TimeLimit").and_then(|v| parse_duration(v)),
        submit_time: fields.get("SubmitTime").and_then(|v| parse_slurm_timestamp(v)),
        start_time: fields.get("StartTime").and_then(|v| parse_slurm_timestamp(v)),
        node_count: fields.get("NumNodes").and_then(|v| v.parse().ok()),
        cpus: fields.get("NumCPUs").and_then(|v| v.parse().ok()),
        mem_mb: fields.get("MinMemoryNode").and_then(|v| parse_memory_mb(v)),
        nodelist: fields
            .get("NodeList")
            .and_then(|v| non_empty_string(v))
            .filter(|n| n != "(null)"),
        command: fields
            .get("Command")
            .and_then(|v| non_empty_string(v))
            .filter(|c| c != "(null)"),
        work_dir: path_field(&fields, "WorkDir"),
        stdout_path: path_field(&fields, "StdOut"),
        stderr_path: path_field(&fields, "StdErr"),
        exit: parse_exit_status(fields.get("ExitCode").copied().unwrap_or("0:0")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use sterm_parsers::ExitStatus;

    const RECORD: &str = "\
JobId=12345 JobName=train_resnet50
   UserId=alice(1000) GroupId=alice(1000) MCS_label=N/A
   Priority=4294901759 Nice=0 Account=lab QOS=normal
   JobState=RUNNING Reason=None Dependency=(null)
   Requeue=1 Restarts=0 BatchFlag=1 Reboot=0 ExitCode=0:0
   RunTime=00:05:23 TimeLimit=08:00:00 TimeMin=N/A
   SubmitTime=2024-01-15T10:00:00 EligibleTime=2024-01-15T10:00:00
   StartTime=2024-01-15T10:05:00 EndTime=2024-01-15T18:05:00 Deadline=N/A
   Partition=gpu AllocNode:Sid=login01:1234
   NodeList=node01
   NumNodes=1 NumCPUs=4 NumTasks=1 CPUs/Task=4
   MinMemoryNode=32G MinTmpDiskNode=0
   Command=/scratch/alice/run.sh --epochs 10
   WorkDir=/scratch/alice
   StdErr=/scratch/alice/logs/train 01.err
   StdOut=/scratch/alice/logs/train 01.out
";

    #[test]
    fn test_parse_full_record() {
        let detail = parse_job_detail(RECORD).unwrap();
        assert_eq!(detail.job_id, "12345");
        assert_eq!(detail.name, "train_resnet50");
        assert_eq!(detail.state, JobState::Running);
        assert_eq!(detail.user.as_deref(), Some("alice"));
        assert_eq!(detail.partition.as_deref(), Some("gpu"));
        assert!(detail.reason.is_none());
        assert_eq!(detail.run_time, Some(Duration::from_secs(5 * 60 + 23)));
        assert_eq!(detail.time_limit, Some(Duration::from_secs(8 * 3600)));
        assert_eq!(detail.node_count, Some(1));
        assert_eq!(detail.cpus, Some(4));
        assert_eq!(detail.mem_mb, Some(32 * 1024));
        assert_eq!(detail.nodelist.as_deref(), Some("node01"));
        assert_eq!(detail.exit, ExitStatus::Exited(0));
    }

    #[test]
    fn test_path_fields_keep_spaces() {
        let detail = parse_job_detail(RECORD).unwrap();
        assert_eq!(
            detail.command.as_deref(),
            Some("/scratch/alice/run.sh --epochs 10")
        );
        assert_eq!(
            detail.stdout_path.as_deref().map(|p| p.as_str()),
            Some("/scratch/alice/logs/train 01.out")
        );
        assert_eq!(
            detail.work_dir.as_deref().map(|p| p.as_str()),
            Some("/scratch/alice")
        );
    }

    #[test]
    fn test_pending_job_placeholders() {
        let output = "\
JobId=99 JobName=queued
   JobState=PENDING Reason=Resources
   RunTime=00:00:00 TimeLimit=01:00:00
   StartTime=Unknown
   NodeList=(null)
   StdOut=(null)
";
        let detail = parse_job_detail(output).unwrap();
        assert_eq!(detail.state, JobState::Pending);
        assert_eq!(detail.reason.as_deref(), Some("Resources"));
        assert!(detail.start_time.is_none());
        assert!(detail.nodelist.is_none());
        assert!(detail.stdout_path.is_none());
    }

    #[test]
    fn test_missing_job_id_is_error() {
        assert!(parse_job_detail("JobName=orphan JobState=RUNNING\n").is_err());
        assert!(parse_job_detail("").is_err());
    }
}
