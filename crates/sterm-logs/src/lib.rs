//! Incremental tailing of job stdout/stderr files.
//!
//! A byte cursor is kept per (job, stream) pair; each call returns only
//! the bytes appended since the last call, never re-reading from the
//! start of the file.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use sterm_slurm::Job;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TailError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
}

/// Which output stream of a job to tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Byte offset into a resolved log path. Advances monotonically;
/// reset only when the resolved path changes or the file shrinks.
#[derive(Debug, Clone)]
pub struct LogCursor {
    pub path: Utf8PathBuf,
    pub offset: u64,
}

/// Substitute Slurm filename placeholders with per-job values.
///
/// Supported: %j (job id), %x (job name), %u (user), %A (array master
/// id), %a (array task index), %% (literal %). Unknown placeholders
/// are kept as-is.
pub fn resolve_placeholders(template: &str, job: &Job) -> String {
    let (array_master, array_index) = match job.job_id.split_once('_') {
        Some((master, index)) => (master, index),
        None => (job.job_id.as_str(), ""),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('j') => out.push_str(&job.job_id),
            Some('x') => out.push_str(&job.name),
            Some('u') => out.push_str(job.user.as_deref().unwrap_or("")),
            Some('A') => out.push_str(array_master),
            Some('a') => out.push_str(array_index),
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}

/// Resolve the log path for one stream of a job: substitute
/// placeholders and anchor relative templates at the job's working
/// directory.
pub fn resolve_log_path(job: &Job, kind: StreamKind) -> Utf8PathBuf {
    let template = match kind {
        StreamKind::Stdout => &job.stdout_template,
        StreamKind::Stderr => &job.stderr_template,
    };
    let resolved = resolve_placeholders(template, job);
    let path = Utf8Path::new(&resolved);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        match &job.work_dir {
            Some(dir) => dir.join(path),
            None => path.to_path_buf(),
        }
    }
}

/// Tails job log files, tracking one cursor per (job, stream).
#[derive(Default)]
pub struct LogTailer {
    cursors: HashMap<(String, StreamKind), LogCursor>,
}

impl LogTailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the bytes appended to the job's log since the previous
    /// call (possibly empty), advancing the cursor.
    ///
    /// A path that does not exist yet (the log is created only when the
    /// job starts) yields an empty result without error. If the
    /// resolved path differs from the cursor's (a re-render), or the
    /// file shrank below the cursor, the cursor resets to 0.
    pub fn tail(&mut self, job: &Job, kind: StreamKind) -> Result<Vec<u8>, TailError> {
        let path = resolve_log_path(job, kind);
        let key = (job.job_id.clone(), kind);

        let cursor = self
            .cursors
            .entry(key)
            .or_insert_with(|| LogCursor {
                path: path.clone(),
                offset: 0,
            });
        if cursor.path != path {
            cursor.path = path.clone();
            cursor.offset = 0;
        }

        let mut file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(TailError::Io { path, source: e }),
        };

        let len = file
            .metadata()
            .map_err(|e| TailError::Io {
                path: path.clone(),
                source: e,
            })?
            .len();
        // Truncated since last read
        if len < cursor.offset {
            cursor.offset = 0;
        }

        file.seek(SeekFrom::Start(cursor.offset))
            .map_err(|e| TailError::Io {
                path: path.clone(),
                source: e,
            })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf).map_err(|e| TailError::Io {
            path: path.clone(),
            source: e,
        })?;

        cursor.offset += buf.len() as u64;
        Ok(buf)
    }

    /// The current cursor for a (job, stream) pair, if any.
    pub fn cursor(&self, job_id: &str, kind: StreamKind) -> Option<&LogCursor> {
        self.cursors.get(&(job_id.to_string(), kind))
    }

    /// Drop cursors for jobs no longer present.
    pub fn retain_jobs(&mut self, live: &[&str]) {
        self.cursors.retain(|(id, _), _| live.contains(&id.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use sterm_slurm::JobState;
    use tempfile::TempDir;

    fn job_in(dir: &Utf8Path, id: &str, template: &str) -> Job {
        Job {
            job_id: id.to_string(),
            name: "train".to_string(),
            state: JobState::Running,
            partition: None,
            user: Some("alice".to_string()),
            submit_time: None,
            start_time: None,
            work_dir: Some(dir.to_path_buf()),
            node_count: 1,
            cpus: 1,
            mem_mb: None,
            gres: None,
            nodelist: None,
            reason: None,
            stdout_template: template.to_string(),
            stderr_template: template.to_string(),
        }
    }

    #[test]
    fn test_resolve_placeholders() {
        let dir = Utf8PathBuf::from("/tmp");
        let job = job_in(&dir, "12345", "%x-%j.out");
        assert_eq!(resolve_placeholders("%x-%j.out", &job), "train-12345.out");
        assert_eq!(resolve_placeholders("%u/100%%", &job), "alice/100%");

        let array = job_in(&dir, "12345_7", "slurm-%A_%a.out");
        assert_eq!(
            resolve_placeholders("slurm-%A_%a.out", &array),
            "slurm-12345_7.out"
        );
    }

    #[test]
    fn test_relative_template_anchored_at_work_dir() {
        let dir = Utf8PathBuf::from("/scratch/alice");
        let job = job_in(&dir, "42", "slurm-%j.out");
        assert_eq!(
            resolve_log_path(&job, StreamKind::Stdout),
            Utf8PathBuf::from("/scratch/alice/slurm-42.out")
        );
    }

    #[test]
    fn test_tail_increments() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let job = job_in(dir, "100", "slurm-%j.out");
        let log_path = dir.join("slurm-100.out");

        fs::write(&log_path, vec![b'a'; 500]).unwrap();

        let mut tailer = LogTailer::new();
        let first = tailer.tail(&job, StreamKind::Stdout).unwrap();
        assert_eq!(first.len(), 500);
        assert_eq!(tailer.cursor("100", StreamKind::Stdout).unwrap().offset, 500);

        // No new data
        let second = tailer.tail(&job, StreamKind::Stdout).unwrap();
        assert!(second.is_empty());

        // Exactly the appended bytes come back
        let mut f = fs::OpenOptions::new().append(true).open(&log_path).unwrap();
        f.write_all(&vec![b'b'; 200]).unwrap();
        drop(f);
        let third = tailer.tail(&job, StreamKind::Stdout).unwrap();
        assert_eq!(third, vec![b'b'; 200]);
        assert_eq!(tailer.cursor("100", StreamKind::Stdout).unwrap().offset, 700);
    }

    #[test]
    fn test_missing_file_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let job = job_in(dir, "200", "slurm-%j.out");

        let mut tailer = LogTailer::new();
        assert!(tailer.tail(&job, StreamKind::Stdout).unwrap().is_empty());
    }

    #[test]
    fn test_path_change_resets_cursor() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();

        let job = job_in(dir, "300", "a-%j.out");
        fs::write(dir.join("a-300.out"), b"first").unwrap();
        let mut tailer = LogTailer::new();
        assert_eq!(tailer.tail(&job, StreamKind::Stdout).unwrap(), b"first");

        // Same job re-rendered with a new output path
        let mut moved = job.clone();
        moved.stdout_template = "b-%j.out".to_string();
        fs::write(dir.join("b-300.out"), b"second").unwrap();
        assert_eq!(tailer.tail(&moved, StreamKind::Stdout).unwrap(), b"second");
    }

    #[test]
    fn test_truncation_resets_cursor() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let job = job_in(dir, "400", "slurm-%j.out");
        let log_path = dir.join("slurm-400.out");

        fs::write(&log_path, b"0123456789").unwrap();
        let mut tailer = LogTailer::new();
        assert_eq!(tailer.tail(&job, StreamKind::Stdout).unwrap().len(), 10);

        fs::write(&log_path, b"new").unwrap();
        assert_eq!(tailer.tail(&job, StreamKind::Stdout).unwrap(), b"new");
    }

    #[test]
    fn test_streams_have_independent_cursors() {
        let temp = TempDir::new().unwrap();
        let dir = Utf8Path::from_path(temp.path()).unwrap();
        let mut job = job_in(dir, "500", "out-%j.log");
        job.stderr_template = "err-%j.log".to_string();

        fs::write(dir.join("out-500.log"), b"out bytes").unwrap();
        fs::write(dir.join("err-500.log"), b"err").unwrap();

        let mut tailer = LogTailer::new();
        assert_eq!(tailer.tail(&job, StreamKind::Stdout).unwrap(), b"out bytes");
        assert_eq!(tailer.tail(&job, StreamKind::Stderr).unwrap(), b"err");
        assert_eq!(tailer.cursor("500", StreamKind::Stderr).unwrap().offset, 3);
    }
}
