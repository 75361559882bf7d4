use anyhow::Result;
use clap::Parser;

use rbackup_cli::{cli, commands};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    commands::backup::run(&args)
}
