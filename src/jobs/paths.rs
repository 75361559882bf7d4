//! Source and destination path construction.
use crate::config::{BackupKind, Job, PathSpec};
use crate::error::UnsafeError;

use super::vars::Variables;

/// Normalize a POSIX-style path.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and `..` folds
/// into its parent. An empty result is `.`. A single trailing `/` is kept if
/// the input had one.
#[must_use]
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    if path.is_empty() {
        return ".".to_string();
    }
    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');

    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let body = parts.join("/");
    let mut out = match (absolute, body.is_empty()) {
        (true, _) => format!("/{body}"),
        (false, true) => ".".to_string(),
        (false, false) => body,
    };
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Whether `path` is the current working directory.
#[must_use]
pub fn is_current_dir(path: &str) -> bool {
    matches!(path, "." | "./")
}

/// Where a single job's relative paths live, after all overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTarget {
    /// Backup type.
    pub kind: BackupKind,
    /// rclone remote or SSH host (empty for local).
    pub remote: String,
    /// Normalized root (may be empty).
    pub root: String,
    /// Effective remote user.
    pub user: String,
    /// Effective trunk, variable-resolved.
    pub trunk: String,
    /// Whether the job's program takes `user@host:path` arguments.
    pub ssh_like: bool,
}

impl JobTarget {
    /// Remote name as passed to the program, with `user@` for SSH hosts.
    #[must_use]
    pub fn remote(&self) -> String {
        if self.needs_user_prefix() {
            format!("{}@{}", self.user, self.remote)
        } else {
            self.remote.clone()
        }
    }

    /// Prefix placed before composed paths: empty for local backups,
    /// `remote:` for rclone remotes and `[user@]host:` for SSH hosts.
    #[must_use]
    pub fn prefix(&self) -> String {
        if self.kind == BackupKind::Local || self.remote.is_empty() {
            String::new()
        } else {
            format!("{}:", self.remote())
        }
    }

    /// Value of `$remotePath`.
    #[must_use]
    pub fn remote_path(&self) -> String {
        format!("{}{}", self.prefix(), self.root)
    }

    /// Compose `[prefix]root/trunk/relative`.
    ///
    /// An empty `relative` names the trunk directory itself and always ends
    /// with a single `/`.
    #[must_use]
    pub fn compose(&self, relative: &str) -> String {
        let prefix = self.prefix();
        let joined = [self.root.as_str(), self.trunk.as_str(), relative]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        if joined.is_empty() && !prefix.is_empty() {
            return prefix;
        }

        let mut path = normalize(&joined);
        if relative.is_empty() && !path.ends_with('/') {
            path.push('/');
        }
        format!("{prefix}{path}")
    }

    /// Job-level variables layered over the run-wide ones.
    #[must_use]
    pub fn variables(&self) -> [(&'static str, String); 5] {
        [
            ("user", self.user.clone()),
            ("root", self.root.clone()),
            ("remote", self.remote()),
            ("remotePath", self.remote_path()),
            ("trunk", self.trunk.clone()),
        ]
    }

    fn needs_user_prefix(&self) -> bool {
        self.kind == BackupKind::Host
            && self.ssh_like
            && !self.user.is_empty()
            && !self.remote.is_empty()
            && !self.remote.contains('@')
    }
}

/// Source and destination of one job, computed fresh each time it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Source argument, if any.
    pub source: Option<String>,
    /// Destination argument, if any.
    pub destination: Option<String>,
    /// Whether either side was composed under the root.
    pub uses_root: bool,
}

impl ResolvedPaths {
    /// Resolve both sides of `job`.
    #[must_use]
    pub fn resolve(job: &Job, target: &JobTarget, vars: &Variables) -> Self {
        let side = |spec: Option<&PathSpec>| match spec {
            Some(PathSpec::Absolute(path)) => Some(normalize(&vars.resolve(path))),
            Some(PathSpec::Relative(path)) => Some(target.compose(&vars.resolve(path))),
            None => None,
        };
        Self {
            source: side(job.source.as_ref()),
            destination: side(job.destination.as_ref()),
            uses_root: [&job.source, &job.destination]
                .into_iter()
                .any(|s| matches!(s, Some(PathSpec::Relative(_)))),
        }
    }

    /// Refuse a destination that is the current directory unless forced.
    ///
    /// # Errors
    ///
    /// Returns [`UnsafeError::CurrentDirDestination`] when the destination is
    /// `.` and `force` is off.
    pub fn check_destination(&self, force: bool) -> Result<(), UnsafeError> {
        match &self.destination {
            Some(dest) if is_current_dir(dest) && !force => {
                Err(UnsafeError::CurrentDirDestination)
            }
            _ => Ok(()),
        }
    }

    /// Source then destination, skipping sides that are not set.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        self.source
            .iter()
            .chain(self.destination.iter())
            .cloned()
            .collect()
    }
}
