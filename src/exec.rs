//! Process execution seam.
//!
//! The engine never spawns processes directly; it goes through the
//! [`Executor`] trait so that job logic can be exercised in tests without
//! running `rclone` or `rsync`.
use std::io::Write as _;
use std::process::{Command, ExitStatus, Output, Stdio};

use anyhow::{Context, Result};

use crate::error::JobError;

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (empty when output was forwarded).
    pub stdout: String,
    /// Captured standard error (empty when output was forwarded).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExecResult {
    /// Build a result for a process whose output was not captured.
    #[must_use]
    pub const fn from_code(code: Option<i32>) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            success: matches!(code, Some(0)),
            code,
        }
    }
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl From<ExitStatus> for ExecResult {
    fn from(status: ExitStatus) -> Self {
        Self::from_code(status.code())
    }
}

/// Abstraction over process execution.
///
/// Arguments are always passed as discrete tokens; nothing is ever handed to
/// a shell.
#[cfg_attr(test, mockall::automock)]
pub trait Executor: Send + Sync {
    /// Run `program` with stdin/stdout/stderr inherited from this process and
    /// wait for it to exit. A non-zero exit is reported in the result, not as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or waited on.
    fn run_attached(&self, program: &str, args: &[String]) -> Result<ExecResult>;

    /// Run `program`, write `input` to its stdin, and capture its output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned, fed, or waited on.
    fn run_with_input(&self, program: &str, args: &[String], input: &str) -> Result<ExecResult>;

    /// Check if a program is available on `PATH`.
    fn which(&self, program: &str) -> bool;
}

/// [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run_attached(&self, program: &str, args: &[String]) -> Result<ExecResult> {
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| JobError::Spawn {
                program: program.to_string(),
                source,
            })?;
        Ok(ExecResult::from(status))
    }

    fn run_with_input(&self, program: &str, args: &[String], input: &str) -> Result<ExecResult> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| JobError::Spawn {
                program: program.to_string(),
                source,
            })?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .with_context(|| format!("writing input to {program}"))?;
        }
        let output = child
            .wait_with_output()
            .with_context(|| format!("waiting for {program}"))?;
        Ok(ExecResult::from(output))
    }

    fn which(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}
