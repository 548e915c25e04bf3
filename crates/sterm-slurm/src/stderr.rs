//! Classification of stderr text from failed commands.
//!
//! The exact wording is Slurm-version-dependent, so the patterns are a
//! configurable table rather than hard-coded matches. Anything
//! unrecognized falls back to [`FailureKind::Other`] and the raw
//! stderr is surfaced to the user unchanged.

use once_cell::sync::Lazy;
use regex::RegexSet;

/// What a failed command's stderr told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    JobNotFound,
    PermissionDenied,
    Other,
}

/// Regex table mapping stderr text to failure kinds.
#[derive(Debug, Clone)]
pub struct StderrPatterns {
    job_not_found: RegexSet,
    permission_denied: RegexSet,
}

static DEFAULT_NOT_FOUND: &[&str] = &[
    r"(?i)invalid job id",
    r"(?i)no such job",
    r"(?i)job .* not found",
];

static DEFAULT_PERMISSION: &[&str] = &[
    r"(?i)permission denied",
    r"(?i)access.*denied",
    r"(?i)operation not permitted",
    r"(?i)unauthori[sz]ed",
];

static DEFAULTS: Lazy<StderrPatterns> = Lazy::new(|| {
    StderrPatterns::new(DEFAULT_NOT_FOUND, DEFAULT_PERMISSION)
        .unwrap_or_else(|e| panic!("built-in stderr patterns are valid: {e}"))
});

impl StderrPatterns {
    /// Build a pattern table from regex lists.
    pub fn new<S: AsRef<str>>(
        job_not_found: &[S],
        permission_denied: &[S],
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            job_not_found: RegexSet::new(job_not_found)?,
            permission_denied: RegexSet::new(permission_denied)?,
        })
    }

    /// The built-in table covering common Slurm wordings.
    pub fn defaults() -> Self {
        DEFAULTS.clone()
    }

    /// The built-in table extended with site-specific patterns.
    pub fn with_extra<S: AsRef<str>>(
        job_not_found: &[S],
        permission_denied: &[S],
    ) -> Result<Self, regex::Error> {
        let not_found: Vec<&str> = DEFAULT_NOT_FOUND
            .iter()
            .copied()
            .chain(job_not_found.iter().map(AsRef::as_ref))
            .collect();
        let permission: Vec<&str> = DEFAULT_PERMISSION
            .iter()
            .copied()
            .chain(permission_denied.iter().map(AsRef::as_ref))
            .collect();
        Self::new(&not_found, &permission)
    }

    /// Classify a failed command's stderr text.
    pub fn classify(&self, stderr: &str) -> FailureKind {
        if self.job_not_found.is_match(stderr) {
            FailureKind::JobNotFound
        } else if self.permission_denied.is_match(stderr) {
            FailureKind::PermissionDenied
        } else {
            FailureKind::Other
        }
    }
}

impl Default for StderrPatterns {
    fn default() -> Self {
        Self::defaults()
    }
}
