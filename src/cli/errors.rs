//! CLI-specific error types
//!
//! Every CLI error is fatal: it is printed with its code and the process
//! exits non-zero.

use std::io;

use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::grading::GradingError;
use crate::store::StoreError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("CAREERHUB_CLI_CONFIG_ERROR: {0}")]
    Config(#[from] ConfigError),

    #[error("CAREERHUB_CLI_STORAGE_ERROR: {0}")]
    Store(#[from] StoreError),

    #[error("CAREERHUB_CLI_AUTH_ERROR: {0}")]
    Auth(#[from] AuthError),

    #[error("CAREERHUB_CLI_GRADING_ERROR: {0}")]
    Grading(#[from] GradingError),

    #[error("CAREERHUB_CLI_IO_ERROR: {0}")]
    Io(#[from] io::Error),

    /// Runtime or server could not start
    #[error("CAREERHUB_CLI_BOOT_FAILED: {0}")]
    BootFailed(String),
}

impl CliError {
    pub fn boot_failed(msg: impl Into<String>) -> Self {
        CliError::BootFailed(msg.into())
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        match self {
            CliError::Config(_) => "CAREERHUB_CLI_CONFIG_ERROR",
            CliError::Store(_) => "CAREERHUB_CLI_STORAGE_ERROR",
            CliError::Auth(_) => "CAREERHUB_CLI_AUTH_ERROR",
            CliError::Grading(_) => "CAREERHUB_CLI_GRADING_ERROR",
            CliError::Io(_) => "CAREERHUB_CLI_IO_ERROR",
            CliError::BootFailed(_) => "CAREERHUB_CLI_BOOT_FAILED",
        }
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_code() {
        let err = CliError::boot_failed("port in use");
        assert_eq!(err.code_str(), "CAREERHUB_CLI_BOOT_FAILED");
        assert_eq!(err.to_string(), "CAREERHUB_CLI_BOOT_FAILED: port in use");

        let err = CliError::from(AuthError::EmailAlreadyExists);
        assert!(err.to_string().starts_with(err.code_str()));
    }
}
