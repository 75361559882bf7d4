//! Argument vector construction for a job's main program.
use crate::config::Job;

use super::paths::{ResolvedPaths, normalize};
use super::vars::Variables;

/// rclone subcommand used when a job does not name one.
pub const DEFAULT_SUBCOMMAND: &str = "check";

/// rclone subcommand that reads `--filters-file` and honours `--resync`.
const BISYNC: &str = "bisync";

/// Flag that turns "nothing transferred" into a distinct exit code.
const ERROR_ON_NO_TRANSFER: &str = "--error-on-no-transfer";

/// What a known program accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProgramCaps {
    /// Takes a subcommand as its first argument.
    pub subcommand: bool,
    /// Understands `-v` / `-q`.
    pub verbosity: bool,
    /// Understands `--dry-run`.
    pub dry_run: bool,
    /// Understands `--log-file <file>`.
    pub log_file: bool,
    /// Understands `--filter-from` (`--filters-file` under bisync).
    pub filter_from: bool,
    /// Understands `--include-from` and `--exclude-from`.
    pub include_exclude: bool,
    /// Addresses remotes as `user@host:path`.
    pub ssh_like: bool,
    /// Exit code meaning "nothing to transfer" under `--error-on-no-transfer`.
    pub no_transfer_exit: Option<i32>,
}

const RCLONE: ProgramCaps = ProgramCaps {
    subcommand: true,
    verbosity: true,
    dry_run: true,
    log_file: true,
    filter_from: true,
    include_exclude: true,
    ssh_like: false,
    no_transfer_exit: Some(9),
};

const RSYNC: ProgramCaps = ProgramCaps {
    subcommand: false,
    verbosity: true,
    dry_run: true,
    log_file: true,
    filter_from: false,
    include_exclude: true,
    ssh_like: true,
    no_transfer_exit: None,
};

const SSH: ProgramCaps = ProgramCaps {
    subcommand: false,
    verbosity: true,
    dry_run: false,
    log_file: false,
    filter_from: false,
    include_exclude: false,
    ssh_like: true,
    no_transfer_exit: None,
};

/// Base name of `exec`: directory and a trailing `.exe` removed.
#[must_use]
pub fn program_name(exec: &str) -> &str {
    let base = exec.rsplit(['/', '\\']).next().unwrap_or(exec);
    base.len()
        .checked_sub(4)
        .filter(|&i| base.get(i..).is_some_and(|ext| ext.eq_ignore_ascii_case(".exe")))
        .and_then(|i| base.get(..i))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(base)
}

/// Capabilities of `exec`. Unknown programs get none.
#[must_use]
pub fn capabilities(exec: &str) -> ProgramCaps {
    match program_name(exec) {
        "rclone" => RCLONE,
        "rsync" | "cwrsync" => RSYNC,
        "scp" | "sftp" | "ssh" => SSH,
        _ => ProgramCaps::default(),
    }
}

impl ProgramCaps {
    /// Whether exit status `code` counts as success for a run with `args`.
    #[must_use]
    pub fn accepts_exit(&self, code: i32, args: &[String]) -> bool {
        code == 0
            || (self.no_transfer_exit == Some(code)
                && args.iter().any(|a| a == ERROR_ON_NO_TRANSFER))
    }
}

/// Run-wide switches that shape the argument vector.
#[derive(Debug, Clone, Copy, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct BuildOptions<'a> {
    /// `--verbose`.
    pub verbose: bool,
    /// `--quiet`.
    pub quiet: bool,
    /// `--dry-run`.
    pub dry_run: bool,
    /// `--resync`.
    pub resync: bool,
    /// Log file handed to programs that accept one.
    pub log_file: Option<&'a str>,
}

/// A fully built main command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program followed by its arguments.
    pub argv: Vec<String>,
    /// Capabilities of the program.
    pub caps: ProgramCaps,
}

impl CommandLine {
    /// Build the command line for `job`.
    ///
    /// Order: program, subcommand, job args, verbosity, `--dry-run`,
    /// `--log-file`, filter flags, `--resync-mode`, source, destination.
    #[must_use]
    pub fn build(
        job: &Job,
        opts: &BuildOptions<'_>,
        vars: &Variables,
        paths: &ResolvedPaths,
    ) -> Self {
        let exec = vars.resolve(&job.command.exec);
        let caps = capabilities(&exec);
        let subcommand = job
            .command
            .subcommand
            .as_deref()
            .map_or_else(|| DEFAULT_SUBCOMMAND.to_string(), |s| vars.resolve(s));
        let bisync = caps.subcommand && subcommand == BISYNC;

        let mut argv = vec![exec];
        if caps.subcommand {
            argv.push(subcommand);
        }
        argv.extend(vars.resolve_all(&job.command.args));

        if caps.verbosity {
            if opts.verbose {
                argv.push("-v".to_string());
            } else if opts.quiet {
                argv.push("-q".to_string());
            }
        }
        if caps.dry_run && opts.dry_run {
            argv.push("--dry-run".to_string());
        }
        if caps.log_file
            && let Some(file) = opts.log_file
        {
            argv.extend(["--log-file".to_string(), file.to_string()]);
        }

        let filter_file = |file: &String| normalize(&vars.resolve(file));
        if caps.filter_from
            && let Some(file) = &job.filter_from
        {
            let flag = if bisync { "--filters-file" } else { "--filter-from" };
            argv.extend([flag.to_string(), filter_file(file)]);
        }
        if caps.include_exclude {
            if let Some(file) = &job.include_from {
                argv.extend(["--include-from".to_string(), filter_file(file)]);
            }
            if let Some(file) = &job.exclude_from {
                argv.extend(["--exclude-from".to_string(), filter_file(file)]);
            }
        }

        if bisync && opts.resync {
            argv.extend([
                "--resync-mode".to_string(),
                vars.resolve(&job.resync_mode),
            ]);
        }

        argv.extend(paths.args());
        Self { argv, caps }
    }

    /// Program to spawn.
    #[must_use]
    pub fn program(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    /// Arguments after the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

/// Render an argument vector for display.
#[must_use]
pub fn display(argv: &[String]) -> String {
    argv.join(" ")
}
