//! Entry point of the `rbackup` command.
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::Local;

use crate::cli::Cli;
use crate::exec::{Executor, SystemExecutor};
use crate::jobs::Engine;
use crate::logging::{ConsoleLevel, Log, Logger, init_subscriber};
use crate::operations::{FileSystemOps, SystemFileSystemOps};
use crate::platform::Platform;
use crate::prompt::{Confirm, StdinConfirm};

use super::{CommandSetup, log_setup, run_to_completion};

/// Run the backup described by `cli`.
///
/// # Errors
///
/// Returns an error if setup fails or any job fails.
pub fn run(cli: &Cli) -> Result<()> {
    let setup = CommandSetup::init(cli, &Platform::detect(&SystemExecutor), Local::now())?;

    let level = if cli.debug {
        ConsoleLevel::Debug
    } else if cli.quiet {
        ConsoleLevel::Quiet
    } else {
        ConsoleLevel::Normal
    };
    init_subscriber(level, setup.log_file.as_deref()).with_context(|| {
        format!(
            "creating log file {}",
            setup
                .log_file
                .as_ref()
                .map_or_else(String::new, |p| p.display().to_string())
        )
    })?;

    let log = Arc::new(Logger::new(setup.log_file.clone()));
    execute(
        setup,
        Arc::new(SystemExecutor),
        Arc::new(StdinConfirm),
        Arc::new(SystemFileSystemOps),
        &log,
    )
}

/// Run a prepared backup with the given seams, recording results on `log`.
///
/// # Errors
///
/// Returns an error if one or more jobs failed.
pub fn execute(
    setup: CommandSetup,
    executor: Arc<dyn Executor>,
    confirm: Arc<dyn Confirm>,
    fs_ops: Arc<dyn FileSystemOps>,
    log: &Arc<Logger>,
) -> Result<()> {
    let warnings = setup.warnings(executor.as_ref());
    log_setup(&setup, &warnings, log.as_ref());

    let CommandSetup { config, ctx, .. } = setup;
    let engine = Engine {
        ctx: Arc::new(ctx),
        executor,
        confirm,
        fs_ops,
        log: Arc::clone(log) as Arc<dyn Log>,
    };
    run_to_completion(&engine, &config, log)
}
