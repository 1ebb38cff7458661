//! CLI command implementations

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::{create_email_sender, AuthService, User};
use crate::config::AppConfig;
use crate::grading::GradingClient;
use crate::http_server::{AppState, HttpServer};
use crate::store::Database;

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Dispatch a parsed command
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Init { config } => init(&config).map(|_| ()),
        Command::Serve { config, port } => serve(&config, port),
        Command::CreateAdmin {
            config,
            email,
            name,
            password,
        } => {
            let config = AppConfig::load(&config)?;
            let admin = create_admin(&config, &name, &email, &password)?;
            println!("Created admin {} ({})", admin.email, admin.id);
            Ok(())
        }
    }
}

/// Write the default config and create its data directory
pub fn init(config_path: &Path) -> CliResult<AppConfig> {
    let config = AppConfig::write_default(config_path)?;

    if let Some(data_dir) = &config.data_dir {
        fs::create_dir_all(data_dir)?;
    }

    println!("Wrote {}", config_path.display());
    println!(
        "Create the first administrator with: careerhub create-admin --config {} --email <email> --name <name> --password <password>",
        config_path.display()
    );
    Ok(config)
}

/// Open the configured store, in memory when no data directory is set
pub fn open_database(config: &AppConfig) -> CliResult<Arc<Database>> {
    let db = match &config.data_dir {
        Some(dir) => Database::open(dir)?,
        None => {
            warn!("no data_dir configured; data is kept in memory and lost on exit");
            Database::in_memory()
        }
    };
    Ok(Arc::new(db))
}

/// Build the shared handler state from configuration
pub fn build_state(config: AppConfig) -> CliResult<AppState> {
    let db = open_database(&config)?;

    if config.email.is_none() {
        warn!("no SMTP configured; invite emails are logged instead of sent");
    }
    let email_sender = create_email_sender(config.email.clone());

    let grader = match config.grading.clone() {
        Some(grading) => {
            info!(model = %grading.model, base_url = %grading.base_url, "server-side grading enabled");
            Some(GradingClient::new(grading)?)
        }
        None => None,
    };

    Ok(AppState::new(config, db, email_sender, grader))
}

/// Run the HTTP API until interrupted
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = AppConfig::load(config_path)?;
    if let Some(port) = port {
        config.http.port = port;
    }

    // Start the async runtime and run the server
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let state = build_state(config)?;
        HttpServer::new(state)
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server error: {}", e)))
    })
}

/// Create an administrator in the configured store
pub fn create_admin(config: &AppConfig, name: &str, email: &str, password: &str) -> CliResult<User> {
    let db = open_database(config)?;
    let service = AuthService::new(
        db,
        &config.auth,
        create_email_sender(None),
        config.invite_ttl_days,
    );

    Ok(service.create_admin(name, email, password)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, Role};
    use crate::config::ConfigError;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> AppConfig {
        AppConfig {
            data_dir: Some(dir.path().join("data")),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("careerhub.json");

        init(&path).unwrap();
        assert!(path.exists());

        let again = init(&path);
        assert!(matches!(
            again,
            Err(CliError::Config(ConfigError::AlreadyExists(_)))
        ));
    }

    #[test]
    fn test_create_admin_persists() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);

        let admin = create_admin(&config, "Root", "Root@School.edu", "password123").unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.email, "root@school.edu");

        // Reopening sees the stored account
        let db = open_database(&config).unwrap();
        assert!(db.find_user_by_email("root@school.edu").unwrap().is_some());

        let duplicate = create_admin(&config, "Root", "root@school.edu", "password123");
        assert!(matches!(
            duplicate,
            Err(CliError::Auth(AuthError::EmailAlreadyExists))
        ));
    }

    #[test]
    fn test_in_memory_without_data_dir() {
        let config = AppConfig {
            data_dir: None,
            ..AppConfig::default()
        };
        let db = open_database(&config).unwrap();
        assert_eq!(db.users.count(|_| true).unwrap(), 0);
    }

    #[test]
    fn test_build_state_without_optional_services() {
        let config = AppConfig {
            data_dir: None,
            ..AppConfig::default()
        };
        let state = build_state(config).unwrap();
        assert!(state.grader.is_none());
    }
}
