//! CLI module for careerhub
//!
//! Provides command-line interface for:
//! - init: Write a default config file
//! - serve: Run the HTTP API
//! - create-admin: Bootstrap the first administrator

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{build_state, create_admin, init, open_database, run_command, serve};
pub use errors::{CliError, CliResult};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
