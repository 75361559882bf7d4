//! Core logging types: job entries, status, and the [`Log`] trait.

/// Job result for summary reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    /// Group the job belongs to.
    pub group: String,
    /// Human-readable job name.
    pub name: String,
    /// Final status of the job.
    pub status: JobStatus,
    /// Optional detail message (e.g., skip reason or exit code).
    pub message: Option<String>,
}

/// Status of a finished job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// The main command succeeded.
    Succeeded,
    /// The job did not run (disabled, filtered, declined, unsafe, or a
    /// required prerequisite failed).
    Skipped,
    /// The main command failed.
    Failed,
}

/// Per-status job counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobCounts {
    /// Jobs that succeeded.
    pub succeeded: usize,
    /// Jobs that were skipped.
    pub skipped: usize,
    /// Jobs that failed.
    pub failed: usize,
}

impl JobCounts {
    /// Count the statuses in `entries`.
    #[must_use]
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a JobEntry>) -> Self {
        entries
            .into_iter()
            .fold(Self::default(), |mut counts, entry| {
                match entry.status {
                    JobStatus::Succeeded => counts.succeeded += 1,
                    JobStatus::Skipped => counts.skipped += 1,
                    JobStatus::Failed => counts.failed += 1,
                }
                counts
            })
    }

    /// Total number of jobs counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }
}

/// Abstraction over logging backends.
///
/// The job engine logs through this trait so that tests can run it with an
/// isolated [`Logger`](super::logger::Logger) instead of the global console.
pub trait Log: Send + Sync {
    /// Log a stage header (group or job start).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a debug message (may be suppressed on console).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a job result for the summary.
    fn record_job(&self, group: &str, name: &str, status: JobStatus, message: Option<&str>);
}
