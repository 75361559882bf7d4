//! Find the config file for a name given on the command line.
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Extensions tried, in order, after the bare name.
const EXTENSIONS: &[&str] = &["json", "jsonc"];

/// A config file chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    /// Config name (file stem), exposed as `$configName`.
    pub name: String,
    /// Full path of the file, exposed as `$configPath`.
    pub path: PathBuf,
}

/// Resolve `requested` to a config file.
///
/// If `requested` names an existing file it is used directly and its stem
/// becomes the config name. Otherwise `<config_dir>/<requested>`,
/// `<requested>.json` and `<requested>.jsonc` are tried in that order.
///
/// # Errors
///
/// Returns [`ConfigError::MissingConfigDir`] if the config directory does not
/// exist, or [`ConfigError::NotFound`] (listing the available configs) if no
/// candidate file exists.
pub fn locate(requested: &str, config_dir: &Path) -> Result<ConfigLocation, ConfigError> {
    let direct = Path::new(requested);
    if direct.is_file() {
        return Ok(ConfigLocation {
            name: file_stem(direct).unwrap_or_else(|| requested.to_string()),
            path: canonical(direct),
        });
    }

    if !config_dir.is_dir() {
        return Err(ConfigError::MissingConfigDir(config_dir.to_path_buf()));
    }

    let base = config_dir.join(requested);
    let candidates: Vec<PathBuf> = std::iter::once(base.clone())
        .chain(EXTENSIONS.iter().map(|ext| base.with_extension(ext)))
        .collect();

    candidates
        .iter()
        .find(|p| p.is_file())
        .map(|p| ConfigLocation {
            name: requested.to_string(),
            path: canonical(p),
        })
        .ok_or_else(|| ConfigError::NotFound {
            name: requested.to_string(),
            dir: config_dir.to_path_buf(),
            tried: candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
            available: available_configs(config_dir),
        })
}

/// List config names (stems of `*.json` / `*.jsonc` files) in `dir`, sorted.
#[must_use]
pub fn available_configs(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| EXTENSIONS.contains(&e))
        })
        .filter_map(|p| file_stem(&p))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
