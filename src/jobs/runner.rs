//! Runs a single argument vector and reports how it ended.
use anyhow::Result;

use crate::exec::{ExecResult, Executor};
use crate::logging::Log;
use crate::prompt::Confirm;

use super::command::display;

/// How a run request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// The process ran to completion (successfully or not).
    Completed(ExecResult),
    /// The user answered "no" at the interactive prompt.
    Declined,
    /// Not spawned because of `--dry-run`.
    DryRun,
}

/// Executes commands with inherited stdio, optionally asking first.
#[derive(Clone, Copy)]
pub struct TaskRunner<'a> {
    executor: &'a dyn Executor,
    confirm: &'a dyn Confirm,
    log: &'a dyn Log,
    interactive: bool,
}

impl std::fmt::Debug for TaskRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRunner")
            .field("interactive", &self.interactive)
            .finish_non_exhaustive()
    }
}

impl<'a> TaskRunner<'a> {
    /// Create a runner.
    #[must_use]
    pub const fn new(
        executor: &'a dyn Executor,
        confirm: &'a dyn Confirm,
        log: &'a dyn Log,
        interactive: bool,
    ) -> Self {
        Self {
            executor,
            confirm,
            log,
            interactive,
        }
    }

    /// Run `argv`. With `skip_for_dry_run` set the command is only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub fn run(&self, argv: &[String], skip_for_dry_run: bool) -> Result<RunStatus> {
        let Some((program, args)) = argv.split_first() else {
            anyhow::bail!("empty command line");
        };
        let line = display(argv);

        if skip_for_dry_run {
            self.log.dry_run(&format!("would run: {line}"));
            return Ok(RunStatus::DryRun);
        }

        self.log.info(&format!("shell> {line}"));
        if self.interactive && !self.ask(&line) {
            return Ok(RunStatus::Declined);
        }

        let result = self.executor.run_attached(program, args)?;
        self.log.debug(&format!(
            "{program} exited with {}",
            result
                .code
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"))
        ));
        Ok(RunStatus::Completed(result))
    }

    /// Show `line` and ask whether to run it. An unanswerable prompt counts
    /// as a "no".
    fn ask(&self, line: &str) -> bool {
        match self.confirm.confirm(&format!("Run `{line}`?")) {
            Ok(true) => true,
            Ok(false) => {
                self.log.info("declined");
                false
            }
            Err(e) => {
                self.log.warn(&format!("no answer, not running: {e:#}"));
                false
            }
        }
    }
}
