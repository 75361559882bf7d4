//! Domain-specific error types for the backup engine.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`], [`JobError`])
//! while command handlers at the CLI boundary convert them to
//! [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! RbackupError
//! ├── Config(ConfigError)  : locating, parsing, validating the config (fatal)
//! ├── Unsafe(UnsafeError)  : destination/root safety checks (job skipped)
//! └── Job(JobError)        : prerequisite or command failures (job level)
//! ```
//!
//! Only [`ConfigError`] aborts a run. The other kinds are contained at job or
//! group granularity and end up in the run summary.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the backup engine.
#[derive(Error, Debug)]
pub enum RbackupError {
    /// Configuration-related error (locating, parsing, validating).
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A safety check refused to run a job.
    #[error("Unsafe operation: {0}")]
    Unsafe(#[from] UnsafeError),

    /// A job could not complete.
    #[error("Job error: {0}")]
    Job(#[from] JobError),
}

/// Errors that arise while loading the backup configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config directory does not exist.
    #[error(
        "config dir '{}' does not exist; create it and add at least one backup config in JSON format",
        .0.display()
    )]
    MissingConfigDir(PathBuf),

    /// No config with the requested name was found.
    #[error("no config named '{name}' in {} (tried: {}); configs available: {}",
        dir.display(), tried.join(", "), available.join(", "))]
    NotFound {
        /// Requested config name.
        name: String,
        /// Directory that was searched.
        dir: PathBuf,
        /// File names that were tried.
        tried: Vec<String>,
        /// Config names present in the directory.
        available: Vec<String>,
    },

    /// The config file could not be read.
    #[error("IO error reading config file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid JSON or does not match the schema.
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },

    /// The config declares an unknown backup type.
    #[error("config type '{0}' invalid, must be one of: local, cloud, host")]
    InvalidType(String),

    /// A required attribute is missing.
    #[error("{location}: missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Human-readable location (group/job) of the problem.
        location: String,
        /// Name of the missing attribute.
        attribute: &'static str,
    },

    /// Two groups share the same name.
    #[error("duplicate group name '{0}'")]
    DuplicateGroup(String),

    /// A CLI override could not be interpreted.
    #[error("invalid override {flag} '{value}': {reason}")]
    InvalidOverride {
        /// Flag that carried the value.
        flag: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

/// A job refused to run because its effect could be destructive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsafeError {
    /// The destination resolves to the current working directory.
    #[error(
        "won't use current directory (.) as destination; use --force or set destination to an environment variable (ex. $PWD)"
    )]
    CurrentDirDestination,

    /// The local backup root is missing.
    #[error("local backup root '{0}' does not exist and needs to be created; use --force")]
    MissingRoot(String),
}

/// Errors that arise while running a job.
#[derive(Error, Debug)]
pub enum JobError {
    /// A required prerequisite task did not succeed.
    #[error("prerequisite '{task}' failed, skipping pending task(s)")]
    PrereqFailed {
        /// Name of the prerequisite task.
        task: String,
    },

    /// The main command exited non-zero.
    #[error("command failed with exit code {code}")]
    CommandFailed {
        /// Exit code reported by the process (`-1` when killed by a signal).
        code: i32,
    },

    /// The process could not be started.
    #[error("failed to execute '{program}': {source}")]
    Spawn {
        /// Program that could not be started.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn missing_config_dir_display() {
        let e = ConfigError::MissingConfigDir(PathBuf::from("/home/u/.config/rbackup"));
        assert!(e.to_string().contains("/home/u/.config/rbackup"));
        assert!(e.to_string().contains("does not exist"));
    }

    #[test]
    fn not_found_lists_tried_and_available() {
        let e = ConfigError::NotFound {
            name: "media".to_string(),
            dir: PathBuf::from("/conf"),
            tried: vec!["media".to_string(), "media.json".to_string()],
            available: vec!["rbackup".to_string(), "photos".to_string()],
        };
        let msg = e.to_string();
        assert!(msg.contains("no config named 'media'"));
        assert!(msg.contains("media.json"));
        assert!(msg.contains("rbackup, photos"));
    }

    #[test]
    fn invalid_type_display() {
        let e = ConfigError::InvalidType("tape".to_string());
        assert_eq!(
            e.to_string(),
            "config type 'tape' invalid, must be one of: local, cloud, host"
        );
    }

    #[test]
    fn missing_attribute_display() {
        let e = ConfigError::MissingAttribute {
            location: "group 'media', job 'music'".to_string(),
            attribute: "command.exec",
        };
        assert_eq!(
            e.to_string(),
            "group 'media', job 'music': missing required attribute 'command.exec'"
        );
    }

    #[test]
    fn io_error_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: PathBuf::from("/conf/rbackup.json"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
        assert!(e.to_string().contains("/conf/rbackup.json"));
    }

    #[test]
    fn unsafe_missing_root_display() {
        let e = UnsafeError::MissingRoot("/mnt/backup".to_string());
        assert!(e.to_string().contains("'/mnt/backup' does not exist"));
        assert!(e.to_string().contains("--force"));
    }

    #[test]
    fn job_error_command_failed_display() {
        let e = JobError::CommandFailed { code: 23 };
        assert_eq!(e.to_string(), "command failed with exit code 23");
    }

    #[test]
    fn rbackup_error_from_config_error() {
        let e: RbackupError = ConfigError::DuplicateGroup("media".to_string()).into();
        assert!(e.to_string().contains("Configuration error"));
        assert!(e.to_string().contains("media"));
    }

    #[test]
    fn rbackup_error_from_unsafe_error() {
        let e: RbackupError = UnsafeError::CurrentDirDestination.into();
        assert!(e.to_string().contains("Unsafe operation"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<RbackupError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<UnsafeError>();
        assert_send_sync::<JobError>();
    }

    #[test]
    fn config_error_converts_to_anyhow() {
        let e = ConfigError::InvalidType("x".to_string());
        let _anyhow_err: anyhow::Error = e.into();
    }
}
