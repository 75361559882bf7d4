//! Non-fatal configuration checks.
//!
//! Hard errors (bad JSON, invalid type, missing `command.exec`) are raised
//! while loading. Everything here only produces [`ValidationWarning`]s that
//! the run controller logs before the first job starts.
use crate::exec::Executor;

use super::{BackupKind, Config, PathSpec, infer_kind};

/// A validation warning detected after the configuration was loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Where the problem is (e.g., "config", "group 'media'").
    pub source: String,
    /// The specific item that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self, config: &Config, executor: &dyn Executor) -> Vec<ValidationWarning>;
}

/// Checks the top-level backup target attributes.
#[derive(Debug, Default)]
pub struct TargetValidator;

impl ConfigValidator for TargetValidator {
    fn validate(&self, config: &Config, _executor: &dyn Executor) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let has_remote = config.remote.as_deref().is_some_and(|r| !r.is_empty());
        let has_user = config.user.as_deref().is_some_and(|u| !u.is_empty());

        let kind = config.kind.unwrap_or_else(|| {
            let inferred = infer_kind(has_user, has_remote);
            warnings.push(ValidationWarning::new(
                "config",
                "type",
                format!("no type given, assuming '{inferred}'"),
            ));
            inferred
        });

        if matches!(kind, BackupKind::Cloud | BackupKind::Host) && !has_remote {
            warnings.push(ValidationWarning::new(
                "config",
                "remote",
                format!("type '{kind}' without a remote"),
            ));
        }

        if config.root.as_deref().is_none_or(str::is_empty) && uses_relative_paths(config) {
            warnings.push(ValidationWarning::new(
                "config",
                "root",
                "root is empty; relative paths resolve against the current directory",
            ));
        }

        warnings
    }
}

/// Checks each job's command and paths.
#[derive(Debug, Default)]
pub struct JobValidator;

impl ConfigValidator for JobValidator {
    fn validate(&self, config: &Config, executor: &dyn Executor) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for group in &config.groups {
            let source = format!("group '{}'", group.name);
            if group.name.is_empty() {
                warnings.push(ValidationWarning::new(
                    "config",
                    "groups",
                    "group without a name can only be excluded with --no-groups ''",
                ));
            }
            for job in group.jobs.iter().filter(|j| j.enabled) {
                if !executor.which(&job.command.exec) {
                    warnings.push(ValidationWarning::new(
                        &source,
                        &job.name,
                        format!("program '{}' not found on PATH", job.command.exec),
                    ));
                }
                if job.source.is_none() && job.destination.is_none() {
                    warnings.push(ValidationWarning::new(
                        &source,
                        &job.name,
                        "neither source nor destination is set",
                    ));
                }
            }
        }
        warnings
    }
}

fn uses_relative_paths(config: &Config) -> bool {
    config
        .groups
        .iter()
        .flat_map(|g| &g.jobs)
        .flat_map(|j| [&j.source, &j.destination])
        .any(|p| matches!(p, Some(PathSpec::Relative(_))))
}

/// Run every validator against `config`.
#[must_use]
pub fn validate_all(config: &Config, executor: &dyn Executor) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 2] = [&TargetValidator, &JobValidator];
    validators
        .iter()
        .flat_map(|v| v.validate(config, executor))
        .collect()
}

/// Return the names in `requested` that match no group of `config`.
#[must_use]
pub fn unknown_groups<'a>(config: &Config, requested: &'a [String]) -> Vec<&'a str> {
    requested
        .iter()
        .filter(|name| !config.groups.iter().any(|g| &g.name == *name))
        .map(String::as_str)
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{CommandSpec, Group, Job, JobMode};
    use crate::exec::MockExecutor;
    use std::path::PathBuf;

    fn job(name: &str, enabled: bool) -> Job {
        Job {
            enabled,
            name: name.to_string(),
            description: String::new(),
            mode: JobMode::Push,
            trunk: None,
            user: None,
            source: Some(PathSpec::Absolute("/data".to_string())),
            destination: Some(PathSpec::Relative("data".to_string())),
            command: CommandSpec {
                exec: "rclone".to_string(),
                subcommand: None,
                args: vec![],
                user: None,
            },
            filter_from: None,
            include_from: None,
            exclude_from: None,
            resync_mode: "newer".to_string(),
            prereq: vec![],
            on_success: vec![],
        }
    }

    fn config(jobs: Vec<Job>) -> Config {
        Config {
            name: "test".to_string(),
            path: PathBuf::from("/conf/test.json"),
            kind: Some(BackupKind::Cloud),
            remote: Some("drive".to_string()),
            root: Some("backups".to_string()),
            user: None,
            trunk: None,
            log_file: None,
            groups: vec![Group {
                name: "media".to_string(),
                skip_on_fail: false,
                jobs,
            }],
        }
    }

    fn executor(found: bool) -> MockExecutor {
        let mut exec = MockExecutor::new();
        exec.expect_which().return_const(found);
        exec
    }

    #[test]
    fn valid_config_has_no_warnings() {
        let warnings = validate_all(&config(vec![job("music", true)]), &executor(true));
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    }

    #[test]
    fn missing_program_is_reported_for_enabled_jobs_only() {
        let cfg = config(vec![job("music", true), job("photos", false)]);
        let warnings = JobValidator.validate(&cfg, &executor(false));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].item, "music");
        assert!(warnings[0].message.contains("rclone"));
    }

    #[test]
    fn inferred_type_is_reported() {
        let mut cfg = config(vec![]);
        cfg.kind = None;
        let warnings = TargetValidator.validate(&cfg, &executor(true));
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "no type given, assuming 'cloud'");
    }

    #[test]
    fn cloud_without_remote_is_reported() {
        let mut cfg = config(vec![]);
        cfg.remote = None;
        let warnings = TargetValidator.validate(&cfg, &executor(true));
        assert!(warnings.iter().any(|w| w.item == "remote"));
    }

    #[test]
    fn empty_root_with_relative_paths_is_reported() {
        let mut cfg = config(vec![job("music", true)]);
        cfg.root = Some(String::new());
        let warnings = TargetValidator.validate(&cfg, &executor(true));
        assert!(warnings.iter().any(|w| w.item == "root"));
    }

    #[test]
    fn unknown_groups_are_listed() {
        let cfg = config(vec![]);
        let requested = vec!["media".to_string(), "photos".to_string()];
        assert_eq!(unknown_groups(&cfg, &requested), vec!["photos"]);
    }
}
