//! Command-line interface definitions for the `scw-backup` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::{Parser, Subcommand, ValueEnum};

/// Top-level CLI for the `scw-backup` binary.
#[derive(Debug, Parser)]
#[command(
    name = "scw-backup",
    about = "Create Scaleway images and snapshots, then prune old ones"
)]
pub(crate) struct Cli {
    /// Subcommand to run; defaults to `run`.
    #[command(subcommand)]
    pub(crate) command: Option<Command>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Back up every configured volume and server, then prune old backups.
    #[command(
        name = "run",
        about = "Back up every configured resource and prune old backups"
    )]
    Run(RunCommand),
    /// List one collection of the configured zone.
    #[command(name = "list", about = "List servers, volumes, images or snapshots")]
    List(ListCommand),
}

impl Default for Command {
    fn default() -> Self {
        Self::Run(RunCommand::default())
    }
}

/// Arguments for the `scw-backup run` subcommand.
#[derive(Debug, Default, Parser)]
pub(crate) struct RunCommand {
    /// Read the backup plan from this file instead of the discovered
    /// `scw-backup.toml`.
    #[arg(long, value_name = "PATH")]
    pub(crate) plan: Option<String>,
}

/// Arguments for the `scw-backup list` subcommand.
#[derive(Debug, Parser)]
pub(crate) struct ListCommand {
    /// Collection to list.
    #[arg(value_enum)]
    pub(crate) kind: ListKind,
}

/// Collections accepted by `scw-backup list`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum ListKind {
    /// Instances.
    Servers,
    /// Block volumes.
    Volumes,
    /// Server backups.
    Images,
    /// Volume backups.
    Snapshots,
}
