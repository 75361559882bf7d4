//! Facts about the machine the backup runs on: host name, current user, and
//! the XDG directories used for configs and logs.
//!
//! Everything here reads the process environment, so it is only called while
//! the run context is being built. The job engine itself never calls into
//! this module.
use std::path::PathBuf;

use crate::exec::Executor;

/// Name of the directory (under the config home) holding backup configs, and
/// the name of the default config.
pub const APP_NAME: &str = "rbackup";

/// Host name used when the real one cannot be determined.
pub const UNKNOWN_HOST: &str = "localhost";

/// Machine facts captured once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Host name, the default trunk and `$machineName`.
    pub host_name: String,
    /// Login name used when no user is configured.
    pub current_user: String,
    /// Directory searched for named configs.
    pub config_dir: PathBuf,
    /// Log file used by a bare `--log-file` or `--mail-to`.
    pub default_log_file: PathBuf,
}

impl Platform {
    /// Read the facts from the environment, asking `executor` for the host
    /// name when the environment does not carry it.
    #[must_use]
    pub fn detect(executor: &dyn Executor) -> Self {
        Self {
            host_name: host_name(executor),
            current_user: current_user(),
            config_dir: config_dir(),
            default_log_file: default_log_file(),
        }
    }
}

/// Return the host name of this machine.
///
/// Checks `HOSTNAME` / `COMPUTERNAME`, then the output of `hostname`, then
/// `/proc/sys/kernel/hostname` and `/etc/hostname`, falling back to
/// [`UNKNOWN_HOST`].
#[must_use]
pub fn host_name(executor: &dyn Executor) -> String {
    host_name_with(
        |key| std::env::var(key).ok(),
        executor,
        &["/proc/sys/kernel/hostname", "/etc/hostname"],
    )
}

fn host_name_with(
    env: impl Fn(&str) -> Option<String>,
    executor: &dyn Executor,
    files: &[&str],
) -> String {
    let non_empty = |v: String| Some(v.trim().to_string()).filter(|v| !v.is_empty());

    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|key| env(key).and_then(non_empty))
        .or_else(|| {
            executor
                .run_with_input("hostname", &[], "")
                .ok()
                .filter(|result| result.success)
                .and_then(|result| non_empty(result.stdout))
        })
        .or_else(|| {
            files
                .iter()
                .find_map(|path| std::fs::read_to_string(path).ok().and_then(non_empty))
        })
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

/// Return the login name of the current user (`USER`, `USERNAME`, `LOGNAME`).
#[must_use]
pub fn current_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .filter(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Return the user's home directory (`HOME`, then `USERPROFILE`).
fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_or_else(|_| PathBuf::from("."), PathBuf::from)
}

/// Return `$XDG_CONFIG_HOME/rbackup` (default `~/.config/rbackup`).
#[must_use]
pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map_or_else(|_| home_dir().join(".config"), PathBuf::from)
        .join(APP_NAME)
}

/// Return the default log file `$XDG_STATE_HOME/rbackup.log`
/// (default `~/.local/state/rbackup.log`).
#[must_use]
pub fn default_log_file() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map_or_else(|_| home_dir().join(".local").join("state"), PathBuf::from)
        .join(format!("{APP_NAME}.log"))
}
