//! Strongly typed backup configuration.
//!
//! A config is a strict tree: [`Config`] owns [`Group`]s, which own [`Job`]s,
//! which own [`Task`]s. It is read once at startup and never mutated during a
//! run.
pub mod jsonc;
pub mod locate;
pub mod schema;
pub mod validation;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use schema::{ArgList, RawCommand, RawConfig, RawGroup, RawJob, RawTask};

/// Default compare mode for `rclone bisync --resync`.
pub const DEFAULT_RESYNC_MODE: &str = "newer";

/// Where the backup lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupKind {
    /// A directory on this machine.
    Local,
    /// An rclone remote (`remote:path`).
    Cloud,
    /// Another machine reached over SSH (`user@host:path`).
    Host,
}

impl BackupKind {
    /// Parse the `type` attribute of a config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidType`] for anything but `local`, `cloud`
    /// or `host`.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim() {
            "local" => Ok(Self::Local),
            "cloud" => Ok(Self::Cloud),
            "host" => Ok(Self::Host),
            other => Err(ConfigError::InvalidType(other.to_string())),
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Cloud => write!(f, "cloud"),
            Self::Host => write!(f, "host"),
        }
    }
}

/// Deduce the backup type of a config that does not declare one.
///
/// A user and a remote mean an SSH host, a remote alone means an rclone
/// remote, anything else is a local backup.
#[must_use]
pub const fn infer_kind(has_user: bool, has_remote: bool) -> BackupKind {
    match (has_user, has_remote) {
        (true, true) => BackupKind::Host,
        (false, true) => BackupKind::Cloud,
        (_, false) => BackupKind::Local,
    }
}

/// Direction of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Creates or updates a backup.
    #[default]
    Push,
    /// Restores from a backup.
    Pull,
}

impl fmt::Display for JobMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
        }
    }
}

/// Which jobs a run selects by mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ModeFilter {
    /// Only `push` jobs.
    #[default]
    Push,
    /// Only `pull` jobs.
    Pull,
    /// Jobs of either mode.
    Any,
}

impl ModeFilter {
    /// Whether a job with `mode` is selected.
    #[must_use]
    pub const fn matches(self, mode: JobMode) -> bool {
        matches!(
            (self, mode),
            (Self::Any, _) | (Self::Push, JobMode::Push) | (Self::Pull, JobMode::Pull)
        )
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Push => write!(f, "push"),
            Self::Pull => write!(f, "pull"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// One side (source or destination) of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    /// Used as-is (`source` / `destination`).
    Absolute(String),
    /// Composed under `[remote:]root/trunk/` (`sourceRemote` /
    /// `destinationRemote`). An empty string means the trunk directory itself.
    Relative(String),
}

impl PathSpec {
    /// Pick the side's path from its two attributes. A non-empty absolute
    /// path wins, then the relative one; `None` means no path at all.
    ///
    /// An empty absolute path with no relative attribute is kept, so that it
    /// normalizes to `.` and trips the current-directory check.
    #[must_use]
    pub fn choose(absolute: Option<String>, relative: Option<String>) -> Option<Self> {
        match (absolute, relative) {
            (Some(path), _) if !path.is_empty() => Some(Self::Absolute(path)),
            (_, Some(path)) => Some(Self::Relative(path)),
            (absolute, None) => absolute.map(Self::Absolute),
        }
    }
}

/// The program a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub exec: String,
    /// rclone subcommand (`sync`, `copy`, `bisync`, ...).
    pub subcommand: Option<String>,
    /// Extra arguments, variable-resolved but otherwise verbatim.
    pub args: Vec<String>,
    /// Remote user override, wins over [`Job::user`].
    pub user: Option<String>,
}

/// An auxiliary command run before or after a job's main command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Display name.
    pub name: String,
    /// Whether the job is skipped when this (prerequisite) task fails.
    pub required: bool,
    /// Program and arguments.
    pub argv: Vec<String>,
}

/// A single backup job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Disabled jobs are reported as skipped and never run.
    pub enabled: bool,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Push or pull.
    pub mode: JobMode,
    /// Trunk override (may contain variables).
    pub trunk: Option<String>,
    /// Remote user override.
    pub user: Option<String>,
    /// Source side.
    pub source: Option<PathSpec>,
    /// Destination side.
    pub destination: Option<PathSpec>,
    /// Program to run.
    pub command: CommandSpec,
    /// `--filter-from` file.
    pub filter_from: Option<String>,
    /// `--include-from` file.
    pub include_from: Option<String>,
    /// `--exclude-from` file.
    pub exclude_from: Option<String>,
    /// Compare mode used with `--resync`.
    pub resync_mode: String,
    /// Tasks run before the main command.
    pub prereq: Vec<Task>,
    /// Tasks run after the main command succeeds.
    pub on_success: Vec<Task>,
}

/// A named, ordered set of jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Name used by `--groups` / `--no-groups`.
    pub name: String,
    /// Skip the remaining jobs once one fails.
    pub skip_on_fail: bool,
    /// Jobs in run order.
    pub jobs: Vec<Job>,
}

/// A loaded backup config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Config name (file stem).
    pub name: String,
    /// Location of the config file.
    pub path: PathBuf,
    /// Declared backup type; `None` when it must be inferred.
    pub kind: Option<BackupKind>,
    /// rclone remote or SSH host.
    pub remote: Option<String>,
    /// Backup root.
    pub root: Option<String>,
    /// Remote user.
    pub user: Option<String>,
    /// Subdirectory of root for relative paths.
    pub trunk: Option<String>,
    /// Log file (may contain variables).
    pub log_file: Option<String>,
    /// Groups in run order.
    pub groups: Vec<Group>,
}

impl Config {
    /// Read and convert the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if it fails
    /// the checks performed by [`Config::from_raw`].
    pub fn load(path: &Path, name: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = jsonc::load_config(path)?;
        Self::from_raw(raw, name, path)
    }

    /// Convert a deserialized config into the typed model, applying defaults.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid `type`, a job without `command.exec`,
    /// or duplicate group names.
    pub fn from_raw(raw: RawConfig, name: &str, path: &Path) -> Result<Self, ConfigError> {
        let kind = raw.kind.as_deref().map(BackupKind::parse).transpose()?;

        let groups = raw
            .groups
            .unwrap_or_default()
            .into_iter()
            .map(convert_group)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = std::collections::HashSet::new();
        for group in &groups {
            if !seen.insert(group.name.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.name.clone()));
            }
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            kind,
            remote: trimmed(raw.remote),
            root: trimmed(raw.root),
            user: trimmed(raw.user),
            trunk: trimmed(raw.trunk),
            log_file: trimmed(raw.log_file),
            groups,
        })
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn convert_group(raw: RawGroup) -> Result<Group, ConfigError> {
    let name = trimmed(raw.name).unwrap_or_default();
    let jobs = raw
        .jobs
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(i, job)| convert_job(job, &name, i + 1))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Group {
        name,
        skip_on_fail: raw.skip_on_fail,
        jobs,
    })
}

fn convert_job(raw: RawJob, group: &str, position: usize) -> Result<Job, ConfigError> {
    let name = trimmed(raw.name)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("<{position}>"));
    let command = convert_command(raw.command).ok_or_else(|| ConfigError::MissingAttribute {
        location: format!("group '{group}', job '{name}'"),
        attribute: "command.exec",
    })?;

    Ok(Job {
        enabled: raw.enabled.unwrap_or(false),
        description: trimmed(raw.description).unwrap_or_default(),
        mode: raw.mode.unwrap_or_default(),
        trunk: trimmed(raw.trunk),
        user: trimmed(raw.user).filter(|u| !u.is_empty()),
        source: PathSpec::choose(trimmed(raw.source), trimmed(raw.source_remote)),
        destination: PathSpec::choose(trimmed(raw.destination), trimmed(raw.destination_remote)),
        command,
        filter_from: trimmed(raw.filter_from),
        include_from: trimmed(raw.include_from),
        exclude_from: trimmed(raw.exclude_from),
        resync_mode: trimmed(raw.resync_mode)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_RESYNC_MODE.to_string()),
        prereq: convert_tasks(raw.prereq, true),
        on_success: convert_tasks(raw.on_success, false),
        name,
    })
}

fn convert_command(raw: Option<RawCommand>) -> Option<CommandSpec> {
    let raw = raw?;
    let exec = trimmed(raw.exec).filter(|e| !e.is_empty())?;
    Some(CommandSpec {
        exec,
        subcommand: trimmed(raw.subcommand).filter(|s| !s.is_empty()),
        args: raw.args.map(ArgList::into_args).unwrap_or_default(),
        user: trimmed(raw.user).filter(|u| !u.is_empty()),
    })
}

/// Tasks without a command are ignored; unnamed tasks are numbered by their
/// position among the tasks that were kept.
fn convert_tasks(raw: Option<Vec<RawTask>>, may_require: bool) -> Vec<Task> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|t| {
            let argv = t.command?.into_args();
            (!argv.is_empty()).then_some((t.name, t.required, argv))
        })
        .enumerate()
        .map(|(i, (name, required, argv))| Task {
            name: trimmed(name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("<{}>", i + 1)),
            required: may_require && required,
            argv,
        })
        .collect()
}
