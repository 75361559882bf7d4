//! `$name` / `${name}` substitution.
//!
//! The variable set is a snapshot: the process environment is read once when
//! the run context is built, the computed run values are added on top, and
//! each job layers its own target values over that with [`Variables::overlay`].
use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Local};
use regex::Regex;

use crate::platform::APP_NAME;

#[allow(clippy::expect_used)]
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{(\w+)\}|(\w+))").expect("variable pattern is a valid literal")
});

/// Value of `$dashConfigName` for a config called `name`.
#[must_use]
pub fn dash_config_name(name: &str) -> String {
    if name == APP_NAME {
        APP_NAME.to_string()
    } else {
        format!("{APP_NAME}-{name}")
    }
}

/// Run-wide values computed once at startup.
#[derive(Debug, Clone)]
pub struct RunValues<'a> {
    /// Host name of this machine.
    pub machine_name: &'a str,
    /// Config name.
    pub config_name: &'a str,
    /// Full path of the config file.
    pub config_path: &'a str,
    /// Start of the run.
    pub now: DateTime<Local>,
}

/// An immutable set of substitution variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    /// Build a set from explicit pairs.
    #[must_use]
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Snapshot the process environment and add the run-wide values
    /// (`machineName`, `date`, `datetime`, `configName`, `dashConfigName`,
    /// `configPath`). Run values win over environment variables of the same
    /// name.
    #[must_use]
    pub fn from_env(run: &RunValues<'_>) -> Self {
        let env = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        Self::new(env).overlay(Self::run_pairs(run))
    }

    fn run_pairs(run: &RunValues<'_>) -> Vec<(&'static str, String)> {
        vec![
            ("machineName", run.machine_name.to_string()),
            ("date", run.now.format("%Y-%m-%d").to_string()),
            ("datetime", run.now.format("%Y-%m-%d-%H%M%S").to_string()),
            ("configName", run.config_name.to_string()),
            ("dashConfigName", dash_config_name(run.config_name)),
            ("configPath", run.config_path.to_string()),
        ]
    }

    /// Return a copy of this set with `pairs` added (replacing existing names).
    #[must_use]
    pub fn overlay<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut values = self.values.clone();
        values.extend(pairs.into_iter().map(|(k, v)| (k.into(), v.into())));
        Self { values }
    }

    /// Look up a single variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Substitute every known `$name` / `${name}` in `input`.
    ///
    /// Substitution is a single pass: a value containing `$` is inserted
    /// verbatim. Unknown names are left untouched.
    #[must_use]
    pub fn resolve(&self, input: &str) -> String {
        if !input.contains('$') {
            return input.to_string();
        }
        TOKEN
            .replace_all(input, |caps: &regex::Captures<'_>| {
                let whole = caps.get(0).map_or("", |m| m.as_str());
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map_or("", |m| m.as_str());
                self.get(name).map_or_else(
                    || {
                        tracing::debug!("unknown variable '{name}' left as is");
                        whole.to_string()
                    },
                    ToString::to_string,
                )
            })
            .into_owned()
    }

    /// Resolve every element of `args`.
    #[must_use]
    pub fn resolve_all(&self, args: &[String]) -> Vec<String> {
        args.iter().map(|a| self.resolve(a)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vars() -> Variables {
        Variables::new([("HOME", "/home/al"), ("user", "al"), ("trunk", "box")])
    }

    #[test]
    fn resolves_plain_and_braced() {
        let v = vars();
        assert_eq!(v.resolve("$HOME/Music"), "/home/al/Music");
        assert_eq!(v.resolve("${user}_backup"), "al_backup");
    }

    #[test]
    fn unknown_names_pass_through() {
        let v = vars();
        assert_eq!(v.resolve("$nope/${alsonope}"), "$nope/${alsonope}");
    }

    #[test]
    fn lone_dollar_is_kept() {
        assert_eq!(vars().resolve("cost: $ 5"), "cost: $ 5");
    }

    #[test]
    fn substitution_is_single_pass() {
        let v = Variables::new([("a", "$b"), ("b", "boom")]);
        assert_eq!(v.resolve("$a"), "$b");
    }

    #[test]
    fn longest_name_is_matched() {
        let v = Variables::new([("user", "al"), ("username", "alice")]);
        assert_eq!(v.resolve("$username"), "alice");
        assert_eq!(v.resolve("${user}name"), "alname");
    }

    #[test]
    fn overlay_replaces_without_mutating() {
        let base = vars();
        let job = base.overlay([("user", "bob")]);
        assert_eq!(job.get("user"), Some("bob"));
        assert_eq!(base.get("user"), Some("al"));
        assert_eq!(job.get("HOME"), Some("/home/al"));
    }

    #[test]
    fn dash_config_name_for_default_config() {
        assert_eq!(dash_config_name("rbackup"), "rbackup");
        assert_eq!(dash_config_name("media"), "rbackup-media");
    }

    #[test]
    fn run_values_are_formatted() {
        let run = RunValues {
            machine_name: "box",
            config_name: "media",
            config_path: "/conf/media.json",
            now: Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).single().unwrap(),
        };
        let v = Variables::default().overlay(Variables::run_pairs(&run));
        assert_eq!(v.get("date"), Some("2024-03-09"));
        assert_eq!(v.get("datetime"), Some("2024-03-09-070502"));
        assert_eq!(v.get("dashConfigName"), Some("rbackup-media"));
        assert_eq!(v.get("configPath"), Some("/conf/media.json"));
        assert_eq!(v.get("machineName"), Some("box"));
    }

    #[test]
    fn from_env_includes_environment() {
        let run = RunValues {
            machine_name: "box",
            config_name: "rbackup",
            config_path: "/conf/rbackup.json",
            now: Local::now(),
        };
        let v = Variables::from_env(&run);
        if let Ok(path) = std::env::var("PATH") {
            assert_eq!(v.get("PATH"), Some(path.as_str()));
        }
        assert_eq!(v.get("configName"), Some("rbackup"));
    }
}
