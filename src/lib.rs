//! Configuration-driven backup runner.
//!
//! Reads a JSON config describing groups of backup jobs and runs each job's
//! program (`rclone`, `rsync`, `ssh`/`scp`/`sftp`, or any executable) with a
//! generated argument vector, in declared order.
//!
//! The public API is organised into these layers:
//!
//! - **[`config`]**: locate, parse, and validate the JSON config
//! - **[`jobs`]**: variable substitution, path composition, argv building,
//!   and the job/group state machines
//! - **[`commands`]**: run setup and orchestration up to the final summary
//! - **[`exec`]**, **[`prompt`]**, **[`operations`]**: injectable seams for
//!   side effects
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod jobs;
pub mod logging;
pub mod mail;
pub mod operations;
pub mod platform;
pub mod prompt;
