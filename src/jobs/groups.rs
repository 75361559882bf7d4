//! Group selection and the skip-on-fail policy.
use crate::config::{Config, Group, Job};
use crate::logging::{JobCounts, JobStatus};

use super::{Engine, JobOutcome, execute_job};

/// Run every selected group of `config` in declared order.
///
/// Each job's outcome is recorded on the engine's log. Returns the counts for
/// the whole run.
pub fn run_groups(engine: &Engine, config: &Config) -> JobCounts {
    let mut total = JobCounts::default();
    for group in &config.groups {
        if !engine.ctx.group_selected(&group.name) {
            engine
                .log
                .debug(&format!("group '{}' not selected", group.name));
            continue;
        }
        let counts = run_group(engine, group);
        total.succeeded += counts.succeeded;
        total.skipped += counts.skipped;
        total.failed += counts.failed;
    }
    total
}

/// Run the jobs of one group and emit its summary line.
pub fn run_group(engine: &Engine, group: &Group) -> JobCounts {
    engine.log.stage(&format!("Group '{}'", group.name));

    let mut counts = JobCounts::default();
    let mut failed = false;
    for job in &group.jobs {
        let outcome = if group.skip_on_fail && failed {
            JobOutcome::Skipped("prior job failed".to_string())
        } else if !engine.ctx.mode.matches(job.mode) {
            JobOutcome::Skipped("mode mismatch".to_string())
        } else {
            execute_job(engine, job)
        };

        if matches!(outcome, JobOutcome::Failed(_)) {
            failed = true;
        }
        record(engine, group, job, &outcome, &mut counts);
    }

    engine.log.info(&format!(
        "group '{}': {} succeeded, {} skipped, {} failed",
        group.name, counts.succeeded, counts.skipped, counts.failed
    ));
    counts
}

fn record(engine: &Engine, group: &Group, job: &Job, outcome: &JobOutcome, counts: &mut JobCounts) {
    let (status, message) = match outcome {
        JobOutcome::Succeeded => {
            counts.succeeded += 1;
            (JobStatus::Succeeded, None)
        }
        JobOutcome::Skipped(reason) => {
            counts.skipped += 1;
            (JobStatus::Skipped, Some(reason.clone()))
        }
        JobOutcome::Failed(code) => {
            counts.failed += 1;
            (JobStatus::Failed, Some(format!("exit code {code}")))
        }
    };
    engine
        .log
        .record_job(&group.name, &job.name, status, message.as_deref());
}
