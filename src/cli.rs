//! Command-line interface definition.
use clap::Parser;

use crate::config::ModeFilter;

/// Config name used when none is given.
pub const DEFAULT_CONFIG: &str = "rbackup";

/// Values of `--log-file` that turn file logging off.
const NO_LOG_FILE: &[&str] = &["none", "null", "nul", "no", "console", "/dev/null"];

/// Top-level CLI entry point for the backup runner.
#[derive(Parser, Debug)]
#[command(
    name = "rbackup",
    about = "Run rclone/rsync backup jobs described by a JSON config",
    version
)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Config name (looked up in the config directory) or path to a config file
    #[arg(default_value = DEFAULT_CONFIG)]
    pub config: String,

    /// Pass verbosity to the backup tools
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet tools and show only errors on the console
    #[arg(short, long)]
    pub quiet: bool,

    /// Show debug messages on the console
    #[arg(short, long)]
    pub debug: bool,

    /// Confirm each command before running it
    #[arg(short, long)]
    pub interactive: bool,

    /// Run only these groups
    #[arg(short = 'g', long = "groups", num_args = 1.., conflicts_with = "no_groups")]
    pub groups: Vec<String>,

    /// Skip these groups
    #[arg(short = 'G', long = "no-groups", num_args = 1..)]
    pub no_groups: Vec<String>,

    /// Which job modes to run
    #[arg(short, long, value_enum, default_value_t = ModeFilter::Push)]
    pub mode: ModeFilter,

    /// Override the trunk directory
    #[arg(short, long)]
    pub trunk: Option<String>,

    /// Override the backup root
    #[arg(short, long, conflicts_with = "remote")]
    pub root: Option<String>,

    /// Override the remote: [user@]remote[:root]
    #[arg(short = 'R', long)]
    pub remote: Option<String>,

    /// Preview without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Run bisync jobs with --resync
    #[arg(short = 's', long)]
    pub resync: bool,

    /// Allow writing into the current directory and create a missing root
    #[arg(short, long)]
    pub force: bool,

    /// Log to FILE (default location when FILE is omitted; "none" disables)
    #[arg(short, long, value_name = "FILE", num_args = 0..=1, default_missing_value = "")]
    pub log_file: Option<String>,

    /// Mail the run report to this address (repeatable)
    #[arg(short = 'e', long = "mail-to", value_name = "EMAIL", action = clap::ArgAction::Append)]
    pub mail_to: Vec<String>,
}

/// Where the run log goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// Console only.
    Console,
    /// Console and the default log file.
    Default,
    /// Console and this file (may contain variables).
    File(String),
}

/// Whether `value` asks for console-only logging.
#[must_use]
pub fn disables_log_file(value: &str) -> bool {
    let value = value.trim();
    NO_LOG_FILE.iter().any(|v| v.eq_ignore_ascii_case(value))
}

impl Cli {
    /// Pick the log destination. The command line wins over the config;
    /// mailing a report needs a log file and falls back to the default one.
    #[must_use]
    pub fn log_target(&self, config_log_file: Option<&str>) -> LogTarget {
        let chosen = match self.log_file.as_deref() {
            Some(value) if disables_log_file(value) => return LogTarget::Console,
            Some("") => Some(LogTarget::Default),
            Some(value) => Some(LogTarget::File(value.to_string())),
            None => config_log_file
                .filter(|v| !v.is_empty() && !disables_log_file(v))
                .map(|v| LogTarget::File(v.to_string())),
        };
        match chosen {
            Some(target) => target,
            None if !self.mail_to.is_empty() => LogTarget::Default,
            None => LogTarget::Console,
        }
    }
}
