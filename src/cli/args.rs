//! CLI argument definitions using clap
//!
//! Commands:
//! - careerhub init --config <path>
//! - careerhub serve --config <path> [--port <port>]
//! - careerhub create-admin --config <path> --email <email> --name <name> --password <password>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// careerhub - career services API for schools
#[derive(Parser, Debug)]
#[command(name = "careerhub")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a default configuration file and create the data directory
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./careerhub.json")]
        config: PathBuf,
    },

    /// Run the HTTP API
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./careerhub.json")]
        config: PathBuf,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Create an administrator account
    CreateAdmin {
        /// Path to configuration file
        #[arg(long, default_value = "./careerhub.json")]
        config: PathBuf,

        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        password: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_port() {
        let cli = Cli::try_parse_from(["careerhub", "serve", "--port", "8080"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert_eq!(config, PathBuf::from("./careerhub.json"));
                assert_eq!(port, Some(8080));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_create_admin_requires_fields() {
        assert!(Cli::try_parse_from(["careerhub", "create-admin", "--email", "a@b.io"]).is_err());

        let cli = Cli::try_parse_from([
            "careerhub",
            "create-admin",
            "--config",
            "/etc/careerhub.json",
            "--email",
            "a@b.io",
            "--name",
            "Ada",
            "--password",
            "password123",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::CreateAdmin { .. }));
    }
}
