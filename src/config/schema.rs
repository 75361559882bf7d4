//! Raw on-disk shape of a backup config, as deserialized by `serde_json`.
//!
//! These types mirror the JSON file loosely (every attribute optional) and
//! are converted into the strongly typed model in [`super`] by
//! [`Config::from_raw`](super::Config::from_raw), which applies defaults and
//! reports missing required attributes.
use serde::Deserialize;

use super::JobMode;

/// Top-level config object.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    /// `"local"`, `"cloud"` or `"host"`; inferred when absent.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// rclone remote name or SSH host.
    pub remote: Option<String>,
    /// Backup root directory.
    pub root: Option<String>,
    /// Remote user name.
    pub user: Option<String>,
    /// Subdirectory of root used for relative paths.
    pub trunk: Option<String>,
    /// Log file to write (may contain variables).
    pub log_file: Option<String>,
    /// Backup groups, in run order.
    #[serde(default)]
    pub groups: Option<Vec<RawGroup>>,
}

/// A group of jobs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGroup {
    /// Group name used by `--groups` / `--no-groups`.
    pub name: Option<String>,
    /// Skip the rest of the group once a job fails.
    #[serde(default)]
    pub skip_on_fail: bool,
    /// Jobs, in run order.
    #[serde(default)]
    pub jobs: Option<Vec<RawJob>>,
}

/// A single backup job.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawJob {
    /// Job name.
    pub name: Option<String>,
    /// Whether the job may run.
    pub enabled: Option<bool>,
    /// Remote user override.
    pub user: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// `push` or `pull`.
    pub mode: Option<JobMode>,
    /// Trunk override.
    pub trunk: Option<String>,
    /// Absolute source path.
    pub source: Option<String>,
    /// Source path relative to root/trunk.
    pub source_remote: Option<String>,
    /// Absolute destination path.
    pub destination: Option<String>,
    /// Destination path relative to root/trunk.
    pub destination_remote: Option<String>,
    /// `--include-from` file.
    pub include_from: Option<String>,
    /// `--exclude-from` file.
    pub exclude_from: Option<String>,
    /// `--filter-from` file.
    pub filter_from: Option<String>,
    /// Compare mode used with `--resync`.
    pub resync_mode: Option<String>,
    /// Program to run.
    pub command: Option<RawCommand>,
    /// Tasks run before the command.
    pub prereq: Option<Vec<RawTask>>,
    /// Tasks run after the command succeeds.
    pub on_success: Option<Vec<RawTask>>,
}

/// The program a job runs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommand {
    /// Executable name or path.
    pub exec: Option<String>,
    /// rclone subcommand.
    pub subcommand: Option<String>,
    /// Extra arguments.
    pub args: Option<ArgList>,
    /// Remote user override, wins over the job's `user`.
    pub user: Option<String>,
}

/// A prerequisite or on-success task.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    /// Task name.
    pub name: Option<String>,
    /// Command line to run.
    pub command: Option<ArgList>,
    /// Whether the job depends on this task succeeding.
    #[serde(default)]
    pub required: bool,
}

/// An argument list written either as an array or as one string.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ArgList {
    /// `["-a", "--delete"]`
    List(Vec<String>),
    /// `"-a --delete"`, split on whitespace.
    Line(String),
}

impl ArgList {
    /// Flatten into discrete arguments.
    #[must_use]
    pub fn into_args(self) -> Vec<String> {
        match self {
            Self::List(args) => args,
            Self::Line(line) => line.split_whitespace().map(String::from).collect(),
        }
    }
}
