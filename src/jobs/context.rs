//! Immutable state shared by every job of a run.
use std::sync::Arc;

use crate::config::{BackupKind, Config, Job, ModeFilter, infer_kind};
use crate::error::ConfigError;
use crate::exec::Executor;
use crate::logging::Log;
use crate::operations::FileSystemOps;
use crate::prompt::Confirm;

use super::paths::{JobTarget, normalize};
use super::vars::Variables;

/// Command-line overrides of the config's target attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    /// `--root PATH`.
    pub root: Option<String>,
    /// `--remote [user@]remote[:root]`.
    pub remote: Option<String>,
    /// `--trunk DIR`.
    pub trunk: Option<String>,
}

/// Parts of a `--remote` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSpec {
    /// Text before `@`, if any.
    pub user: Option<String>,
    /// Remote name or host.
    pub remote: String,
    /// Text after the first `:`, if any.
    pub root: Option<String>,
}

/// Split `[user@]remote[:root]`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidOverride`] when the remote part is empty.
pub fn parse_remote(value: &str) -> Result<RemoteSpec, ConfigError> {
    let (user, rest) = match value.split_once('@') {
        Some((user, rest)) => (Some(user.to_string()).filter(|u| !u.is_empty()), rest),
        None => (None, value),
    };
    let (remote, root) = match rest.split_once(':') {
        Some((remote, root)) => (remote, Some(root.to_string()).filter(|r| !r.is_empty())),
        None => (rest, None),
    };
    if remote.is_empty() {
        return Err(ConfigError::InvalidOverride {
            flag: "--remote",
            value: value.to_string(),
            reason: "expected [user@]remote[:root]",
        });
    }
    Ok(RemoteSpec {
        user,
        remote: remote.to_string(),
        root,
    })
}

/// The backup location after command-line overrides, before per-job values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Declared or inferred backup type.
    pub kind: BackupKind,
    /// rclone remote or SSH host.
    pub remote: String,
    /// Normalized, variable-resolved root; empty when unset.
    pub root: String,
    /// User from `--remote` or the config; `None` falls back to the current
    /// user.
    pub user: Option<String>,
    /// Run-wide trunk (unresolved; may reference variables).
    pub trunk: String,
}

impl Target {
    /// Merge `config` with `overrides`.
    ///
    /// `--root` replaces the root. `--remote` replaces the remote and, when
    /// present in the value, the user and root. The trunk comes from
    /// `--trunk`, then the config, then the host name for local and cloud
    /// backups (empty for hosts).
    ///
    /// # Errors
    ///
    /// Returns an error if `--remote` cannot be parsed.
    pub fn resolve(
        config: &Config,
        overrides: &Overrides,
        vars: &Variables,
        host_name: &str,
    ) -> Result<Self, ConfigError> {
        let mut remote = config.remote.clone().unwrap_or_default();
        let mut root = config.root.clone().unwrap_or_default();
        let mut user = config.user.clone().filter(|u| !u.is_empty());

        if let Some(value) = &overrides.root {
            root.clone_from(value);
        } else if let Some(value) = &overrides.remote {
            let spec = parse_remote(value)?;
            remote = spec.remote;
            if let Some(u) = spec.user {
                user = Some(u);
            }
            if let Some(r) = spec.root {
                root = r;
            }
        }

        let kind = config
            .kind
            .unwrap_or_else(|| infer_kind(user.is_some(), !remote.is_empty()));

        let trunk = overrides
            .trunk
            .clone()
            .or_else(|| config.trunk.clone())
            .unwrap_or_else(|| match kind {
                BackupKind::Local | BackupKind::Cloud => host_name.to_string(),
                BackupKind::Host => String::new(),
            });

        let root = vars.resolve(&root);
        Ok(Self {
            kind,
            remote: vars.resolve(&remote),
            root: if root.is_empty() { root } else { normalize(&root) },
            user: user.map(|u| vars.resolve(&u)),
            trunk,
        })
    }

    /// Per-job view: user is `command.user`, then `job.user`, then the target
    /// user, then `current_user`; the job's trunk wins over the run trunk.
    #[must_use]
    pub fn for_job(
        &self,
        job: &Job,
        ssh_like: bool,
        vars: &Variables,
        current_user: &str,
    ) -> JobTarget {
        let user = job
            .command
            .user
            .as_deref()
            .or(job.user.as_deref())
            .or(self.user.as_deref())
            .map_or_else(|| current_user.to_string(), |u| vars.resolve(u));
        let trunk = job.trunk.as_deref().unwrap_or(&self.trunk);
        let trunk = vars.resolve(trunk);
        JobTarget {
            kind: self.kind,
            remote: self.remote.clone(),
            root: self.root.clone(),
            user,
            trunk: if trunk.is_empty() { trunk } else { normalize(&trunk) },
            ssh_like,
        }
    }
}

/// Options and resolved values for one invocation.
#[derive(Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunContext {
    /// Effective backup target.
    pub target: Target,
    /// Run-wide variables.
    pub vars: Variables,
    /// Login name used when no user is configured.
    pub current_user: String,
    /// Which job modes run.
    pub mode: ModeFilter,
    /// Preview only.
    pub dry_run: bool,
    /// Pass `-v` to tools.
    pub verbose: bool,
    /// Pass `-q` to tools.
    pub quiet: bool,
    /// Allow unsafe destinations and create a missing root.
    pub force: bool,
    /// Run bisync jobs with `--resync`.
    pub resync: bool,
    /// Confirm each command.
    pub interactive: bool,
    /// Only these groups run (empty means all).
    pub include_groups: Vec<String>,
    /// These groups never run.
    pub exclude_groups: Vec<String>,
    /// File the run is logged to, handed to tools via `--log-file`.
    pub log_file: Option<String>,
    /// Report recipients.
    pub mail_to: Vec<String>,
}

impl RunContext {
    /// Whether the group named `name` passes the include/exclude filters.
    #[must_use]
    pub fn group_selected(&self, name: &str) -> bool {
        (self.include_groups.is_empty() || self.include_groups.iter().any(|g| g == name))
            && !self.exclude_groups.iter().any(|g| g == name)
    }
}

/// Everything a job needs to run: the run context plus the injectable
/// process, prompt, filesystem and logging seams.
#[derive(Clone)]
pub struct Engine {
    /// Run options.
    pub ctx: Arc<RunContext>,
    /// Process execution.
    pub executor: Arc<dyn Executor>,
    /// Interactive confirmation.
    pub confirm: Arc<dyn Confirm>,
    /// Filesystem queries.
    pub fs_ops: Arc<dyn FileSystemOps>,
    /// Output and job recording.
    pub log: Arc<dyn Log>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ctx", &self.ctx)
            .field("executor", &"<dyn Executor>")
            .field("confirm", &"<dyn Confirm>")
            .field("fs_ops", &self.fs_ops)
            .field("log", &"<dyn Log>")
            .finish()
    }
}
