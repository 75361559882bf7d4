//! Job resolution and execution.
//!
//! A job runs through a fixed sequence: prerequisites, path and argument
//! construction with safety checks, the main command, and on-success tasks.
//! [`execute_job`] drives that sequence and condenses it into a
//! [`JobOutcome`]; [`groups::run_groups`] applies group filtering and the
//! skip-on-fail policy on top.
pub mod command;
pub mod context;
pub mod groups;
pub mod paths;
pub mod runner;
pub mod vars;

pub use context::{Engine, Overrides, RunContext, Target};

use std::path::Path;

use crate::config::{BackupKind, Job, Task};
use crate::error::{JobError, RbackupError, UnsafeError};

use command::{BuildOptions, CommandLine, capabilities, display};
use paths::{ResolvedPaths, is_current_dir};
use runner::{RunStatus, TaskRunner};
use vars::Variables;

/// Exit code reported for a process that was killed by a signal or could not
/// be started.
pub const ABNORMAL_EXIT: i32 = -1;

/// Final state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The main command did not run.
    Skipped(String),
    /// The main command succeeded.
    Succeeded,
    /// The main command failed with this exit code.
    Failed(i32),
}

impl JobOutcome {
    /// Map a job-level error to the outcome it stands for.
    #[must_use]
    pub fn from_error(err: &RbackupError) -> Self {
        match err {
            RbackupError::Job(JobError::CommandFailed { code }) => Self::Failed(*code),
            RbackupError::Job(JobError::Spawn { .. }) => Self::Failed(ABNORMAL_EXIT),
            other => Self::Skipped(err_text(other)),
        }
    }
}

/// Error text without the category prefix.
fn err_text(err: &RbackupError) -> String {
    match err {
        RbackupError::Config(e) => e.to_string(),
        RbackupError::Unsafe(e) => e.to_string(),
        RbackupError::Job(e) => e.to_string(),
    }
}

/// Run one job to completion and report its outcome.
///
/// Never returns an error: every failure is contained in the outcome and
/// logged.
pub fn execute_job(engine: &Engine, job: &Job) -> JobOutcome {
    if !job.enabled {
        engine.log.info(&format!("job '{}' disabled, skipping", job.name));
        return JobOutcome::Skipped("disabled".to_string());
    }

    engine.log.stage(&format!("Job '{}'", job.name));
    if !job.description.is_empty() {
        engine.log.debug(&job.description);
    }

    let outcome = run_job(engine, job).unwrap_or_else(|err| {
        let outcome = JobOutcome::from_error(&err);
        if matches!(outcome, JobOutcome::Skipped(_)) {
            engine.log.warn(&err_text(&err));
        } else {
            engine.log.error(&err_text(&err));
        }
        outcome
    });

    match &outcome {
        JobOutcome::Succeeded => engine.log.info(&format!("job '{}' succeeded", job.name)),
        JobOutcome::Skipped(reason) => {
            engine.log.info(&format!("job '{}' skipped: {reason}", job.name));
        }
        JobOutcome::Failed(code) => engine.log.error(&format!(
            "job '{}' failed with exit code {code}",
            job.name
        )),
    }
    outcome
}

fn run_job(engine: &Engine, job: &Job) -> Result<JobOutcome, RbackupError> {
    let ctx = &engine.ctx;
    let runner = TaskRunner::new(
        engine.executor.as_ref(),
        engine.confirm.as_ref(),
        engine.log.as_ref(),
        ctx.interactive,
    );

    let exec = ctx.vars.resolve(&job.command.exec);
    let caps = capabilities(&exec);
    let target = ctx
        .target
        .for_job(job, caps.ssh_like, &ctx.vars, &ctx.current_user);
    let vars = ctx.vars.overlay(target.variables());

    for (i, task) in job.prereq.iter().enumerate() {
        engine.log.info(&format!(
            "running prerequisite task #{}: '{}'",
            i + 1,
            task.name
        ));
        if !run_task(engine, &runner, &vars, task) && task.required {
            return Err(JobError::PrereqFailed {
                task: task.name.clone(),
            }
            .into());
        }
    }

    let paths = ResolvedPaths::resolve(job, &target, &vars);
    paths.check_destination(ctx.force)?;
    if ctx.force && paths.destination.as_deref().is_some_and(is_current_dir) {
        engine
            .log
            .warn("writing into the current working directory (--force)");
    }
    if target.kind == BackupKind::Local && paths.uses_root {
        ensure_root(engine, &target.root)?;
    }

    let cmd = CommandLine::build(
        job,
        &BuildOptions {
            verbose: ctx.verbose,
            quiet: ctx.quiet,
            dry_run: ctx.dry_run,
            resync: ctx.resync,
            log_file: ctx.log_file.as_deref(),
        },
        &vars,
        &paths,
    );
    engine.log.debug(&format!("command: {}", display(&cmd.argv)));

    let status = runner
        .run(&cmd.argv, ctx.dry_run && !cmd.caps.dry_run)
        .map_err(|e| spawn_error(cmd.program(), e))?;
    let result = match status {
        RunStatus::DryRun => return Ok(JobOutcome::Skipped("dry run".to_string())),
        RunStatus::Declined => return Ok(JobOutcome::Skipped("declined".to_string())),
        RunStatus::Completed(result) => result,
    };

    let code = result.code.unwrap_or(ABNORMAL_EXIT);
    if !cmd.caps.accepts_exit(code, cmd.args()) {
        return Err(JobError::CommandFailed { code }.into());
    }
    if code != 0 {
        engine.log.info("there was nothing to transfer");
    }

    for (i, task) in job.on_success.iter().enumerate() {
        engine.log.info(&format!(
            "running on-success task #{}: '{}'",
            i + 1,
            task.name
        ));
        run_task(engine, &runner, &vars, task);
    }
    Ok(JobOutcome::Succeeded)
}

/// Run an auxiliary task. Returns `true` if it exited with status zero.
fn run_task(engine: &Engine, runner: &TaskRunner<'_>, vars: &Variables, task: &Task) -> bool {
    let argv = vars.resolve_all(&task.argv);
    match runner.run(&argv, false) {
        Ok(RunStatus::Completed(result)) if result.success => true,
        Ok(RunStatus::Completed(result)) => {
            engine.log.error(&format!(
                "task '{}' failed with exit code {}",
                task.name,
                result.code.unwrap_or(ABNORMAL_EXIT)
            ));
            false
        }
        Ok(RunStatus::Declined) => {
            engine.log.warn(&format!("task '{}' declined", task.name));
            false
        }
        Ok(RunStatus::DryRun) => true,
        Err(e) => {
            engine.log.error(&format!("task '{}': {e:#}", task.name));
            false
        }
    }
}

/// Make sure a local backup root exists before writing under it.
fn ensure_root(engine: &Engine, root: &str) -> Result<(), RbackupError> {
    if root.is_empty() || engine.fs_ops.is_dir(Path::new(root)) {
        return Ok(());
    }
    if !engine.ctx.force {
        return Err(UnsafeError::MissingRoot(root.to_string()).into());
    }
    if engine.ctx.dry_run {
        engine
            .log
            .dry_run(&format!("would create backup root {root}"));
        return Ok(());
    }
    engine.log.info(&format!("creating backup root {root}"));
    engine
        .fs_ops
        .create_dir_all(Path::new(root))
        .map_err(|source| JobError::Spawn {
            program: format!("mkdir {root}"),
            source,
        })?;
    Ok(())
}

fn spawn_error(program: &str, err: anyhow::Error) -> RbackupError {
    match err.downcast::<JobError>() {
        Ok(job_error) => job_error.into(),
        Err(other) => JobError::Spawn {
            program: program.to_string(),
            source: std::io::Error::other(format!("{other:#}")),
        }
        .into(),
    }
}


#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::test_helpers::*;
    use super::*;
    use crate::config::PathSpec;

    #[test]
    fn disabled_job_never_runs() {
        let h = Harness::new(run_context(local_target("/mnt")), RecordingExecutor::new());
        let mut j = job("music", "rsync");
        j.enabled = false;
        j.prereq = vec![task("mount", &["mount", "/mnt"], true)];
        assert_eq!(
            execute_job(&h.engine, &j),
            JobOutcome::Skipped("disabled".to_string())
        );
        assert!(h.executor.calls().is_empty());
    }

    #[test]
    fn successful_job_runs_prereqs_main_and_on_success() {
        let h = Harness::new(run_context(local_target("/mnt")), RecordingExecutor::new());
        let mut j = job("music", "rsync");
        j.command.args = vec!["-a".to_string()];
        j.prereq = vec![task("mount", &["mount", "$HOME"], true)];
        j.on_success = vec![task("stamp", &["touch", "/mnt/$trunk/done"], false)];

        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
        assert_eq!(
            h.executor.calls(),
            vec![
                vec!["mount", "/home/al"],
                vec!["rsync", "-a", "/data", "/mnt/box/music"],
                vec!["touch", "/mnt/box/done"],
            ]
        );
    }

    #[test]
    fn failed_required_prereq_skips_job() {
        let h = Harness::new(
            run_context(local_target("/mnt")),
            RecordingExecutor::new().with_exit("mount", 32),
        );
        let mut j = job("music", "rsync");
        j.prereq = vec![
            task("mount", &["mount", "/mnt"], true),
            task("never", &["echo"], false),
        ];
        let outcome = execute_job(&h.engine, &j);
        assert!(
            matches!(&outcome, JobOutcome::Skipped(reason) if reason.contains("'mount'")),
            "unexpected outcome {outcome:?}"
        );
        assert_eq!(h.executor.programs(), vec!["mount"]);
    }

    #[test]
    fn failed_optional_prereq_is_logged_only() {
        let h = Harness::new(
            run_context(local_target("/mnt")),
            RecordingExecutor::new().with_exit("notify", 1),
        );
        let mut j = job("music", "rsync");
        j.prereq = vec![task("notify", &["notify"], false)];
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
        assert!(h.log_contents().contains("task 'notify' failed with exit code 1"));
    }

    #[test]
    fn main_failure_skips_on_success() {
        let h = Harness::new(
            run_context(local_target("/mnt")),
            RecordingExecutor::new().with_exit("rsync", 23),
        );
        let mut j = job("music", "rsync");
        j.on_success = vec![task("stamp", &["touch", "x"], false)];
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Failed(23));
        assert_eq!(h.executor.programs(), vec!["rsync"]);
    }

    #[test]
    fn on_success_failure_does_not_fail_job() {
        let h = Harness::new(
            run_context(local_target("/mnt")),
            RecordingExecutor::new().with_exit("touch", 1),
        );
        let mut j = job("music", "rsync");
        j.on_success = vec![
            task("a", &["touch", "x"], false),
            task("b", &["echo", "y"], false),
        ];
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
        assert_eq!(h.executor.programs(), vec!["rsync", "touch", "echo"]);
    }

    #[test]
    fn spawn_failure_is_abnormal_exit() {
        let h = Harness::new(
            run_context(local_target("/mnt")),
            RecordingExecutor::new().with_spawn_failure("rsync"),
        );
        assert_eq!(
            execute_job(&h.engine, &job("music", "rsync")),
            JobOutcome::Failed(ABNORMAL_EXIT)
        );
    }

    #[test]
    fn current_dir_destination_is_skipped_without_force() {
        let h = Harness::new(run_context(local_target("/mnt")), RecordingExecutor::new());
        let mut j = job("here", "rsync");
        j.destination = Some(PathSpec::Absolute(".".to_string()));
        let outcome = execute_job(&h.engine, &j);
        assert!(matches!(outcome, JobOutcome::Skipped(_)));
        assert!(h.executor.calls().is_empty());
    }

    #[test]
    fn current_dir_destination_runs_with_force() {
        let mut ctx = run_context(local_target("/mnt"));
        ctx.force = true;
        let h = Harness::new(ctx, RecordingExecutor::new());
        let mut j = job("here", "rsync");
        j.destination = Some(PathSpec::Absolute("./".to_string()));
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
        assert_eq!(h.executor.calls()[0], vec!["rsync", "/data", "./"]);
    }

    fn parsed_job(json: &str) -> Job {
        let path = std::path::Path::new("/conf/test.json");
        let raw: crate::config::schema::RawConfig =
            crate::config::jsonc::parse_config(json, path).unwrap();
        let mut config = crate::config::Config::from_raw(raw, "test", path).unwrap();
        config.groups.remove(0).jobs.remove(0)
    }

    #[test]
    fn empty_absolute_destination_is_skipped_without_force() {
        let h = Harness::new(run_context(local_target("/mnt")), RecordingExecutor::new());
        let j = parsed_job(
            r#"{"groups": [{"name": "g", "jobs": [{"name": "oops", "enabled": true,
                "command": {"exec": "rsync"}, "source": "/data", "destination": ""}]}]}"#,
        );
        assert_eq!(
            execute_job(&h.engine, &j),
            JobOutcome::Skipped(UnsafeError::CurrentDirDestination.to_string())
        );
        assert!(h.executor.calls().is_empty());
    }

    #[test]
    fn empty_absolute_destination_runs_with_force() {
        let mut ctx = run_context(local_target("/mnt"));
        ctx.force = true;
        let h = Harness::new(ctx, RecordingExecutor::new());
        let j = parsed_job(
            r#"{"groups": [{"name": "g", "jobs": [{"name": "oops", "enabled": true,
                "command": {"exec": "rsync"}, "source": "/data", "destination": ""}]}]}"#,
        );
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
        assert_eq!(h.executor.calls(), vec![vec!["rsync", "/data", "."]]);
    }

    #[test]
    fn missing_root_is_skipped_without_force() {
        let h = Harness::without_dirs(run_context(local_target("/missing")), RecordingExecutor::new());
        assert_eq!(
            execute_job(&h.engine, &job("music", "rsync")),
            JobOutcome::Skipped(UnsafeError::MissingRoot("/missing".to_string()).to_string())
        );
        assert!(h.executor.calls().is_empty());
        assert!(h.fs.created().is_empty());
    }

    #[test]
    fn missing_root_is_created_with_force() {
        let mut ctx = run_context(local_target("/missing"));
        ctx.force = true;
        let h = Harness::without_dirs(ctx, RecordingExecutor::new());
        assert_eq!(execute_job(&h.engine, &job("music", "rsync")), JobOutcome::Succeeded);
        assert_eq!(h.fs.created(), vec![std::path::PathBuf::from("/missing")]);
    }

    #[test]
    fn missing_root_ignored_when_only_absolute_paths() {
        let h = Harness::without_dirs(run_context(local_target("/missing")), RecordingExecutor::new());
        let mut j = job("music", "rsync");
        j.destination = Some(PathSpec::Absolute("/elsewhere".to_string()));
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
    }

    #[test]
    fn dry_run_with_force_does_not_create_root() {
        let mut ctx = run_context(local_target("/missing"));
        ctx.force = true;
        ctx.dry_run = true;
        let h = Harness::without_dirs(ctx, RecordingExecutor::new());
        assert_eq!(execute_job(&h.engine, &job("music", "rsync")), JobOutcome::Succeeded);
        assert!(h.fs.created().is_empty());
        assert_eq!(
            h.executor.calls()[0],
            vec!["rsync", "--dry-run", "/data", "/missing/box/music"]
        );
    }

    #[test]
    fn dry_run_skips_programs_without_dry_run_flag() {
        let mut ctx = run_context(local_target("/mnt"));
        ctx.dry_run = true;
        let h = Harness::new(ctx, RecordingExecutor::new());
        let mut j = job("script", "backup.sh");
        j.prereq = vec![task("check", &["true"], true)];
        assert_eq!(
            execute_job(&h.engine, &j),
            JobOutcome::Skipped("dry run".to_string())
        );
        assert_eq!(h.executor.programs(), vec!["true"]);
    }

    #[test]
    fn declined_main_command_is_skipped() {
        let mut ctx = run_context(local_target("/mnt"));
        ctx.interactive = true;
        let h = Harness::with_confirm(ctx, RecordingExecutor::new(), FixedAnswer(false));
        assert_eq!(
            execute_job(&h.engine, &job("music", "rsync")),
            JobOutcome::Skipped("declined".to_string())
        );
        assert!(h.executor.calls().is_empty());
    }

    #[test]
    fn declined_required_prereq_skips_job() {
        let mut ctx = run_context(local_target("/mnt"));
        ctx.interactive = true;
        let h = Harness::with_confirm(ctx, RecordingExecutor::new(), FixedAnswer(false));
        let mut j = job("music", "rsync");
        j.prereq = vec![task("mount", &["mount"], true)];
        assert!(matches!(execute_job(&h.engine, &j), JobOutcome::Skipped(_)));
    }

    #[test]
    fn rclone_nothing_to_transfer_is_success() {
        let h = Harness::new(
            run_context(local_target("/mnt")),
            RecordingExecutor::new().with_exit("rclone", 9),
        );
        let mut j = job("music", "rclone");
        j.command.subcommand = Some("copy".to_string());
        j.command.args = vec!["--error-on-no-transfer".to_string()];
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);

        j.command.args.clear();
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Failed(9));
    }

    #[test]
    fn host_job_uses_user_at_host() {
        let target = Target {
            kind: BackupKind::Host,
            remote: "box".to_string(),
            root: "/home/al".to_string(),
            user: None,
            trunk: String::new(),
        };
        let h = Harness::new(run_context(target), RecordingExecutor::new());
        let mut j = job("music", "rsync");
        j.source = Some(PathSpec::Absolute("/music/".to_string()));
        j.destination = Some(PathSpec::Relative("Music".to_string()));
        assert_eq!(execute_job(&h.engine, &j), JobOutcome::Succeeded);
        assert_eq!(
            h.executor.calls()[0],
            vec!["rsync", "/music/", "al@box:/home/al/Music"]
        );
    }

    #[test]
    fn argv_is_idempotent_across_runs() {
        let h = Harness::new(run_context(local_target("/mnt")), RecordingExecutor::new());
        let j = job("music", "rsync");
        execute_job(&h.engine, &j);
        execute_job(&h.engine, &j);
        let calls = h.executor.calls();
        assert_eq!(calls[0], calls[1]);
    }
}
