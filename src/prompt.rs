//! Interactive yes/no confirmation used by `--interactive`.
use std::io::{BufRead, Write};

use anyhow::{Context, Result};

/// Source of yes/no answers.
#[cfg_attr(test, mockall::automock)]
pub trait Confirm: Send + Sync {
    /// Ask `question` and return `true` for yes.
    ///
    /// # Errors
    ///
    /// Returns an error if the answer cannot be read (e.g., stdin closed).
    fn confirm(&self, question: &str) -> Result<bool>;
}

/// Interpret one line of user input. `None` means "ask again".
///
/// An empty answer takes the default (yes).
#[must_use]
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// [`Confirm`] implementation reading from stdin and prompting on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> Result<bool> {
        let stdin = std::io::stdin();
        let mut stderr = std::io::stderr();
        write!(stderr, "{question} [Y/n]: ").ok();
        stderr.flush().ok();
        loop {
            let mut line = String::new();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .context("reading confirmation from stdin")?;
            if read == 0 {
                anyhow::bail!("stdin closed while waiting for confirmation");
            }
            if let Some(answer) = parse_answer(&line) {
                return Ok(answer);
            }
            write!(stderr, "Please answer yes or no. [Y/n]: ").ok();
            stderr.flush().ok();
        }
    }
}
