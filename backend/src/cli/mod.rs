//! Command-line interface for the analytics backend.
//!
//! This module provides the CLI structure for the `market-analytics` binary:
//! running the server, seeding sample data and administering accounts.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{create_admin, set_role, CreateAdminCommand, SeedCommand, SetRoleCommand};

use crate::logging::Verbosity;

/// market-analytics - traffic analytics for farmers markets
///
/// Serves the REST API behind the market dashboard and provides the
/// administrative commands that go with it.
#[derive(Debug, Parser)]
#[command(name = "market-analytics")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,

    /// Replace all data with the sample market
    Seed(SeedCommand),

    /// Create an administrator account
    CreateAdmin(CreateAdminCommand),

    /// Change the role of an existing account
    SetRole(SetRoleCommand),
}

impl Cli {
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
