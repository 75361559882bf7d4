//! Run setup and orchestration shared by the command entry points.
pub mod backup;

use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::cli::{Cli, LogTarget};
use crate::config::validation::{self, ValidationWarning};
use crate::config::{Config, locate};
use crate::exec::Executor;
use crate::jobs::groups::run_groups;
use crate::jobs::vars::{RunValues, Variables};
use crate::jobs::{Engine, Overrides, RunContext, Target};
use crate::logging::{Log, Logger};
use crate::mail::{self, MailSettings};
use crate::platform::{Platform, UNKNOWN_HOST};

/// Shared state produced by the setup sequence.
///
/// Locates and loads the config, snapshots the variables, applies the
/// command-line overrides, and picks the log file, so that running the jobs
/// only needs the finished [`RunContext`].
#[derive(Debug)]
pub struct CommandSetup {
    /// The loaded config.
    pub config: Config,
    /// Immutable run options and resolved values.
    pub ctx: RunContext,
    /// Resolved log file, if file logging is on.
    pub log_file: Option<PathBuf>,
}

impl CommandSetup {
    /// Build the run context for `cli` on `platform`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be found, read, or parsed, or if
    /// an override cannot be interpreted.
    pub fn init(cli: &Cli, platform: &Platform, now: DateTime<Local>) -> Result<Self> {
        let location = locate::locate(&cli.config, &platform.config_dir)?;
        let config = Config::load(&location.path, &location.name)?;

        let config_path = location.path.to_string_lossy();
        let vars = Variables::from_env(&RunValues {
            machine_name: &platform.host_name,
            config_name: &config.name,
            config_path: &config_path,
            now,
        });

        let overrides = Overrides {
            root: cli.root.clone(),
            remote: cli.remote.clone(),
            trunk: cli.trunk.clone(),
        };
        let target = Target::resolve(&config, &overrides, &vars, &platform.host_name)?;

        let log_file = match cli.log_target(config.log_file.as_deref()) {
            LogTarget::Console => None,
            LogTarget::Default => Some(platform.default_log_file.clone()),
            LogTarget::File(file) => Some(PathBuf::from(vars.resolve(&file))),
        };

        let ctx = RunContext {
            target,
            vars,
            current_user: platform.current_user.clone(),
            mode: cli.mode,
            dry_run: cli.dry_run,
            verbose: cli.verbose,
            quiet: cli.quiet,
            force: cli.force,
            resync: cli.resync,
            interactive: cli.interactive,
            include_groups: cli.groups.clone(),
            exclude_groups: cli.no_groups.clone(),
            log_file: log_file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            mail_to: cli.mail_to.clone(),
        };

        Ok(Self {
            config,
            ctx,
            log_file,
        })
    }

    /// Non-fatal problems with the config and the requested groups.
    #[must_use]
    pub fn warnings(&self, executor: &dyn Executor) -> Vec<ValidationWarning> {
        let mut warnings = validation::validate_all(&self.config, executor);
        let requested = self
            .ctx
            .include_groups
            .iter()
            .chain(&self.ctx.exclude_groups)
            .cloned()
            .collect::<Vec<_>>();
        for name in validation::unknown_groups(&self.config, &requested) {
            warnings.push(ValidationWarning::new(
                "command line",
                name,
                "no group with this name",
            ));
        }
        warnings
    }
}

/// Log setup facts and validation warnings.
pub fn log_setup(setup: &CommandSetup, warnings: &[ValidationWarning], log: &dyn Log) {
    let ctx = &setup.ctx;
    log.stage(&format!("Backup '{}'", setup.config.name));
    log.info(&format!("config: {}", setup.config.path.display()));
    log.debug(&format!(
        "type: {}, remote: '{}', root: '{}', trunk: '{}'",
        ctx.target.kind, ctx.target.remote, ctx.target.root, ctx.target.trunk
    ));
    log.debug(&format!(
        "{} group(s), {} job(s)",
        setup.config.groups.len(),
        setup.config.groups.iter().map(|g| g.jobs.len()).sum::<usize>()
    ));
    if ctx.dry_run {
        log.dry_run("no changes will be made");
    }
    if ctx.vars.get("machineName") == Some(UNKNOWN_HOST) {
        log.warn(&format!(
            "could not determine the host name, using '{UNKNOWN_HOST}'"
        ));
    }

    if !warnings.is_empty() {
        log.warn(&format!(
            "found {} configuration warning(s):",
            warnings.len()
        ));
        for warning in warnings {
            log.warn(&format!(
                "  {} [{}]: {}",
                warning.source, warning.item, warning.message
            ));
        }
    }
}

/// Run every selected group, print the summary, mail the report, and bail if
/// any job failed.
///
/// # Errors
///
/// Returns an error if one or more jobs recorded a failure.
pub fn run_to_completion(engine: &Engine, config: &Config, log: &Logger) -> Result<()> {
    run_groups(engine, config);
    log.print_summary();

    if !engine.ctx.mail_to.is_empty() {
        mail_report(engine, config, log);
    }

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} job(s) failed");
    }
    Ok(())
}

/// Send the report to the run's recipients. Failures are logged only.
fn mail_report(engine: &Engine, config: &Config, log: &Logger) {
    let recipients = &engine.ctx.mail_to;
    let subject = mail::subject(log.failure_count());
    let body = mail::report_body(
        &log.render_report(&config.name),
        log.log_path().map(PathBuf::as_path),
    );
    let sent = MailSettings::from_env().and_then(|settings| {
        mail::send(
            engine.executor.as_ref(),
            &settings,
            recipients,
            subject,
            &body,
        )
    });
    match sent {
        Ok(()) => log.info(&format!("report mailed to {}", recipients.join(", "))),
        Err(e) => log.error(&format!("failed to mail report: {e:#}")),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::*;
    use crate::exec::MockExecutor;
    use crate::logging::isolated_logger;

    const CONFIG: &str = r#"{
        // nightly backup
        "root": "/mnt/backup",
        "logFile": "$root_log",
        "groups": [
            { "name": "media", "jobs": [
                { "name": "music", "enabled": true,
                  "command": { "exec": "rsync" },
                  "source": "/music", "destinationRemote": "Music" }
            ]}
        ]
    }"#;

    fn platform(dir: &Path) -> Platform {
        Platform {
            host_name: "box".to_string(),
            current_user: "al".to_string(),
            config_dir: dir.to_path_buf(),
            default_log_file: dir.join("state/rbackup.log"),
        }
    }

    fn setup(args: &[&str]) -> (CommandSetup, tempfile::TempDir) {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("media.jsonc"), CONFIG).unwrap();
        let cli = Cli::parse_from(args);
        let setup = CommandSetup::init(&cli, &platform(tmp.path()), Local::now()).unwrap();
        (setup, tmp)
    }

    #[test]
    fn init_loads_named_config() {
        let (setup, _tmp) = setup(&["rbackup", "media"]);
        assert_eq!(setup.config.name, "media");
        assert_eq!(setup.ctx.target.root, "/mnt/backup");
        assert_eq!(setup.ctx.target.trunk, "box");
        assert_eq!(setup.ctx.current_user, "al");
        assert_eq!(setup.ctx.vars.get("configName"), Some("media"));
        assert_eq!(setup.ctx.vars.get("dashConfigName"), Some("rbackup-media"));
    }

    #[test]
    fn init_applies_overrides() {
        let (setup, _tmp) = setup(&["rbackup", "-r", "/media/usb", "-t", "laptop", "-n", "media"]);
        assert_eq!(setup.ctx.target.root, "/media/usb");
        assert_eq!(setup.ctx.target.trunk, "laptop");
        assert!(setup.ctx.dry_run);
    }

    #[test]
    fn unresolved_config_log_file_passes_through() {
        let (setup, _tmp) = setup(&["rbackup", "media"]);
        assert_eq!(setup.log_file, Some(PathBuf::from("$root_log")));
    }

    #[test]
    fn bare_log_flag_uses_default_file() {
        let (setup, tmp) = setup(&["rbackup", "-l", "--", "media"]);
        assert_eq!(setup.log_file, Some(tmp.path().join("state/rbackup.log")));
        assert_eq!(
            setup.ctx.log_file.as_deref(),
            tmp.path().join("state/rbackup.log").to_str()
        );
    }

    #[test]
    fn log_none_disables_file_logging() {
        let (setup, _tmp) = setup(&["rbackup", "-l", "none", "media"]);
        assert_eq!(setup.log_file, None);
        assert_eq!(setup.ctx.log_file, None);
    }

    #[test]
    fn missing_config_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli::parse_from(["rbackup", "nope"]);
        let err = CommandSetup::init(&cli, &platform(tmp.path()), Local::now()).unwrap_err();
        assert!(err.to_string().contains("no config named 'nope'"));
    }

    #[test]
    fn unknown_groups_are_warned() {
        let (setup, _tmp) = setup(&["rbackup", "-G", "photos", "--", "media"]);
        let mut exec = MockExecutor::new();
        exec.expect_which().returning(|_| true);
        let warnings = setup.warnings(&exec);
        assert!(
            warnings
                .iter()
                .any(|w| w.item == "photos" && w.message == "no group with this name")
        );
    }

    #[test]
    fn unknown_host_name_is_warned() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("media.jsonc"), CONFIG).unwrap();
        let mut platform = platform(tmp.path());
        platform.host_name = UNKNOWN_HOST.to_string();
        let cli = Cli::parse_from(["rbackup", "-l", "none", "media"]);
        let setup = CommandSetup::init(&cli, &platform, Local::now()).unwrap();

        let (log, _log_tmp, _guard) = isolated_logger();
        log_setup(&setup, &[], &log);
        let contents = std::fs::read_to_string(log.log_path().unwrap()).unwrap();
        assert!(contents.contains("could not determine the host name, using 'localhost'"));
    }
}
