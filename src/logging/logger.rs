//! Structured logger with dry-run awareness and summary collection.
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Mutex;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};
use super::types::{JobCounts, JobEntry, JobStatus, Log};

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_job` method is **not** included because its signature differs
/// from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Messages go through [`tracing`]; where they end up (console, log file) is
/// decided by the subscriber installed with
/// [`init_subscriber`](super::subscriber::init_subscriber).
#[derive(Debug)]
pub struct Logger {
    jobs: Mutex<Vec<JobEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// `log_file` is only remembered for display in the run summary; the
    /// file itself is written by the subscriber's file layer.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if file logging is on.
    #[must_use]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded job entries.
    #[must_use]
    pub fn job_entries(&self) -> Vec<JobEntry> {
        self.jobs.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE_TARGET, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a debug message (suppressed on console unless `--debug`; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a job result for the summary.
    pub fn record_job(&self, group: &str, name: &str, status: JobStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.jobs.lock() {
            guard.push(JobEntry {
                group: group.to_string(),
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count recorded jobs by status.
    #[must_use]
    pub fn counts(&self) -> JobCounts {
        self.jobs
            .lock()
            .map_or_else(|_| JobCounts::default(), |g| JobCounts::from_entries(g.iter()))
    }

    /// Count the number of failed jobs.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.counts().failed
    }

    /// Print the summary of all recorded jobs.
    pub fn print_summary(&self) {
        let jobs = self.job_entries();
        if jobs.is_empty() {
            return;
        }

        self.stage("Summary");
        for job in &jobs {
            let (icon, color) = match job.status {
                JobStatus::Succeeded => ("✓", "\x1b[32m"),
                JobStatus::Skipped => ("○", "\x1b[33m"),
                JobStatus::Failed => ("✗", "\x1b[31m"),
            };
            let suffix = job
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            self.info(&format!(
                "{color}{icon} {}/{}{suffix}\x1b[0m",
                job.group, job.name
            ));
        }

        let counts = JobCounts::from_entries(&jobs);
        self.info(&format!(
            "{} jobs: \x1b[32m{} succeeded\x1b[0m, \x1b[33m{} skipped\x1b[0m, \x1b[31m{} failed\x1b[0m",
            counts.total(),
            counts.succeeded,
            counts.skipped,
            counts.failed
        ));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }

    /// Plain-text run report: counts followed by one line per job.
    #[must_use]
    pub fn render_report(&self, config_name: &str) -> String {
        let jobs = self.job_entries();
        let counts = JobCounts::from_entries(&jobs);
        let mut out = format!(
            "Backup '{config_name}' completed with {} error(s).\n\n{} succeeded, {} skipped, {} failed\n\n",
            counts.failed, counts.succeeded, counts.skipped, counts.failed
        );
        for job in &jobs {
            let status = match job.status {
                JobStatus::Succeeded => "succeeded",
                JobStatus::Skipped => "skipped",
                JobStatus::Failed => "FAILED",
            };
            let suffix = job
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            writeln!(out, "{status:<9} {}/{}{suffix}", job.group, job.name).ok();
        }
        out
    }
}

impl Log for Logger {
    forward_log_methods!(stage, info, debug, warn, error, dry_run);

    fn record_job(&self, group: &str, name: &str, status: JobStatus, message: Option<&str>) {
        self.record_job(group, name, status, message);
    }
}
