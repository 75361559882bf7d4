// Shared helpers for integration tests.
//
// Provides a temporary config directory and a fluent builder for backup
// configs so each integration test can set up an isolated environment
// without repeating filesystem boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use serde_json::{Value, json};

use rbackup_cli::cli::Cli;
use rbackup_cli::commands::{CommandSetup, backup};
use rbackup_cli::exec::SystemExecutor;
use rbackup_cli::logging::Logger;
use rbackup_cli::operations::SystemFileSystemOps;
use rbackup_cli::platform::Platform;
use rbackup_cli::prompt::StdinConfirm;

/// Fluent builder for a backup config document.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    doc: serde_json::Map<String, Value>,
    groups: Vec<Value>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level attribute (`type`, `root`, `remote`, ...).
    pub fn attr(mut self, key: &str, value: &str) -> Self {
        self.doc.insert(key.to_string(), json!(value));
        self
    }

    /// Append a group of jobs.
    pub fn group(mut self, name: &str, skip_on_fail: bool, jobs: Vec<Value>) -> Self {
        self.groups.push(json!({
            "name": name,
            "skipOnFail": skip_on_fail,
            "jobs": jobs,
        }));
        self
    }

    pub fn build(mut self) -> String {
        self.doc.insert("groups".to_string(), Value::Array(self.groups));
        serde_json::to_string_pretty(&Value::Object(self.doc)).expect("serialize config")
    }
}

/// An enabled job running `sh -c <script>` with `destination` as `$0`.
pub fn shell_job(name: &str, script: &str, destination: &Path) -> Value {
    json!({
        "name": name,
        "enabled": true,
        "command": { "exec": "sh", "args": ["-c", script] },
        "destination": destination.to_string_lossy(),
    })
}

/// An isolated config directory backed by a [`tempfile::TempDir`].
pub struct IntegrationTestContext {
    /// Temporary directory holding `conf/` and scratch space.
    pub root: tempfile::TempDir,
}

impl IntegrationTestContext {
    /// Create a new context with an empty config directory.
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create temp dir");
        std::fs::create_dir_all(root.path().join("conf")).expect("create conf dir");
        Self { root }
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    pub fn config_dir(&self) -> PathBuf {
        self.root.path().join("conf")
    }

    /// Write `<conf>/<file>` and return its path.
    pub fn write_config(&self, file: &str, content: &str) -> PathBuf {
        let path = self.config_dir().join(file);
        std::fs::write(&path, content).expect("write config");
        path
    }

    pub fn platform(&self) -> Platform {
        Platform {
            host_name: "testhost".to_string(),
            current_user: "tester".to_string(),
            config_dir: self.config_dir(),
            default_log_file: self.root.path().join("state/rbackup.log"),
        }
    }

    /// Parse `args` as a command line and build the run setup.
    pub fn setup(&self, args: &[&str]) -> anyhow::Result<CommandSetup> {
        let cli = Cli::parse_from(std::iter::once("rbackup").chain(args.iter().copied()));
        CommandSetup::init(&cli, &self.platform(), Local::now())
    }

    /// Run a backup end to end with real processes and no log file.
    pub fn run(&self, args: &[&str]) -> (anyhow::Result<()>, Arc<Logger>) {
        let log = Arc::new(Logger::new(None));
        let setup = self.setup(args).expect("setup");
        let result = backup::execute(
            setup,
            Arc::new(SystemExecutor),
            Arc::new(StdinConfirm),
            Arc::new(SystemFileSystemOps),
            &log,
        );
        (result, log)
    }
}

impl Default for IntegrationTestContext {
    fn default() -> Self {
        Self::new()
    }
}
