//! Mailing the run report.
//!
//! The report is handed to a sendmail-compatible program on stdin; no SMTP
//! is spoken here. The sender address comes from `MAIL_FROM` (or
//! `MAIL_USER`), read from the JSON file named by `MAIL_CONFIG` when set and
//! from the environment otherwise.
use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::exec::Executor;

/// Program used when `MAIL_SENDMAIL` is not set.
const DEFAULT_SENDMAIL: &str = "sendmail -t -i";

/// Mail delivery settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailSettings {
    /// `From:` address, if known.
    pub from: Option<String>,
    /// Program followed by its arguments.
    pub sendmail: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MailFile {
    #[serde(rename = "MAIL_FROM")]
    from: Option<String>,
    #[serde(rename = "MAIL_USER")]
    user: Option<String>,
}

impl MailSettings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if `MAIL_CONFIG` names a file that cannot be read or
    /// parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps variable names to values.
    ///
    /// # Errors
    ///
    /// Returns an error if `MAIL_CONFIG` names a file that cannot be read or
    /// parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let from = match non_empty("MAIL_CONFIG") {
            Some(file) => {
                let parsed = read_mail_file(Path::new(&file))?;
                parsed.from.or(parsed.user)
            }
            None => non_empty("MAIL_FROM").or_else(|| non_empty("MAIL_USER")),
        };

        let sendmail = non_empty("MAIL_SENDMAIL")
            .unwrap_or_else(|| DEFAULT_SENDMAIL.to_string())
            .split_whitespace()
            .map(String::from)
            .collect();

        Ok(Self { from, sendmail })
    }
}

fn read_mail_file(path: &Path) -> Result<MailFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading mail config {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("parsing mail config {}", path.display()))
}

/// Subject line for a run with `failed` failed jobs.
#[must_use]
pub const fn subject(failed: usize) -> &'static str {
    if failed > 0 {
        "Backup script error(s)"
    } else {
        "Backup script success"
    }
}

/// Assemble the message handed to sendmail.
#[must_use]
pub fn compose(from: Option<&str>, to: &[String], subject: &str, body: &str) -> String {
    let mut message = String::new();
    if let Some(from) = from {
        writeln!(message, "From: {from}").ok();
    }
    write!(message, "To: {}\nSubject: {subject}\n\n{body}", to.join(", ")).ok();
    if !message.ends_with('\n') {
        message.push('\n');
    }
    message
}

/// Report body: the rendered summary followed by the log file, if any.
#[must_use]
pub fn report_body(summary: &str, log_file: Option<&Path>) -> String {
    let log = log_file.and_then(|p| std::fs::read_to_string(p).ok());
    match log {
        Some(log) if !log.is_empty() => format!("{summary}\nLog:\n\n{log}"),
        _ => summary.to_string(),
    }
}

/// Pipe a message to the configured sendmail program.
///
/// # Errors
///
/// Returns an error if there are no recipients, the program cannot be run,
/// or it exits non-zero.
pub fn send(
    executor: &dyn Executor,
    settings: &MailSettings,
    to: &[String],
    subject: &str,
    body: &str,
) -> Result<()> {
    if to.is_empty() {
        anyhow::bail!("no mail recipients");
    }
    let Some((program, args)) = settings.sendmail.split_first() else {
        anyhow::bail!("MAIL_SENDMAIL is empty");
    };
    let message = compose(settings.from.as_deref(), to, subject, body);
    let result = executor.run_with_input(program, args, &message)?;
    if !result.success {
        anyhow::bail!(
            "{program} exited with {}: {}",
            result
                .code
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}")),
            result.stderr.trim()
        );
    }
    Ok(())
}
