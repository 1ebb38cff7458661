//! Application configuration
//!
//! Loaded from a JSON file. Every field has a default so a partial file (or
//! `{}`) is valid. Secrets can be supplied through the environment instead of
//! the file:
//!
//! - `CAREERHUB_JWT_SECRET`
//! - `CAREERHUB_SMTP_PASSWORD`
//! - `CAREERHUB_AI_API_KEY`

use std::fs;
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::auth::email::EmailConfig;
use crate::grading::GradingConfig;

/// Development signing secret. Accepted, but logged loudly.
pub const DEV_JWT_SECRET: &str = "careerhub-dev-secret-change-me";

const ENV_JWT_SECRET: &str = "CAREERHUB_JWT_SECRET";
const ENV_SMTP_PASSWORD: &str = "CAREERHUB_SMTP_PASSWORD";
const ENV_AI_API_KEY: &str = "CAREERHUB_AI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Config file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Listener and browser-origin settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins the dashboards are served from. Empty allows any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl HttpConfig {
    /// `host:port`, as handed to the listener
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("http.host is required".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("http.port must be > 0".into()));
        }

        for origin in &self.cors_origins {
            let scheme_ok = origin.starts_with("http://") || origin.starts_with("https://");
            if !scheme_ok || origin.ends_with('/') || HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::Invalid(format!(
                    "http.cors_origins: {:?} is not an origin like https://host[:port]",
                    origin
                )));
            }
        }

        Ok(())
    }
}

/// Token and password settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// Lifetime of issued tokens in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,

    #[serde(default = "default_issuer")]
    pub issuer: String,

    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    24
}

fn default_issuer() -> String {
    "careerhub".to_string()
}

fn default_min_password_length() -> usize {
    8
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            issuer: default_issuer(),
            min_password_length: default_min_password_length(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Directory holding one JSON file per collection. An explicit `null`
    /// keeps everything in memory.
    #[serde(default = "default_data_dir")]
    pub data_dir: Option<PathBuf>,

    /// SMTP settings. Invites are recorded but not delivered when unset.
    #[serde(default)]
    pub email: Option<EmailConfig>,

    /// Chat-completion endpoint used for server-side grading.
    #[serde(default)]
    pub grading: Option<GradingConfig>,

    /// How long a teacher invite code stays valid
    #[serde(default = "default_invite_ttl_days")]
    pub invite_ttl_days: i64,
}

fn default_data_dir() -> Option<PathBuf> {
    Some(PathBuf::from("./data"))
}

fn default_invite_ttl_days() -> i64 {
    7
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            auth: AuthConfig::default(),
            data_dir: default_data_dir(),
            email: None,
            grading: None,
            invite_ttl_days: default_invite_ttl_days(),
        }
    }
}

impl AppConfig {
    /// Load, apply environment overrides and validate.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: AppConfig = serde_json::from_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Write the default configuration to `path`. Never overwrites.
    pub fn write_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }

        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config)?;
        fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(ENV_JWT_SECRET).filter(|s| !s.is_empty()) {
            self.auth.jwt_secret = secret;
        }

        if let (Some(email), Some(password)) = (self.email.as_mut(), lookup(ENV_SMTP_PASSWORD)) {
            email.smtp_password = password;
        }

        if let (Some(grading), Some(key)) = (self.grading.as_mut(), lookup(ENV_AI_API_KEY)) {
            grading.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.http.validate()?;

        if self.auth.jwt_secret == DEV_JWT_SECRET {
            warn!("using the development JWT secret; set {} in production", ENV_JWT_SECRET);
        } else if self.auth.jwt_secret.len() < 16 {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret must be at least 16 bytes".into(),
            ));
        }

        if self.auth.token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_hours must be > 0".into(),
            ));
        }

        if self.auth.min_password_length < 6 {
            return Err(ConfigError::Invalid(
                "auth.min_password_length must be at least 6".into(),
            ));
        }

        if self.invite_ttl_days <= 0 {
            return Err(ConfigError::Invalid("invite_ttl_days must be > 0".into()));
        }

        if let Some(grading) = &self.grading {
            if !(0.0..=2.0).contains(&grading.temperature) {
                return Err(ConfigError::Invalid(
                    "grading.temperature must be within [0, 2]".into(),
                ));
            }
            if grading.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid("grading.base_url is required".into()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.http.port, 4000);
        assert_eq!(config.http.address(), "127.0.0.1:4000");
        assert_eq!(config.auth.token_ttl_hours, 24);
        assert_eq!(config.invite_ttl_days, 7);
        assert_eq!(config.data_dir, AppConfig::default().data_dir);
        assert_eq!(config.data_dir, Some(PathBuf::from("./data")));
        assert!(config.email.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_null_data_dir_means_in_memory() {
        let config: AppConfig = serde_json::from_str(r#"{"data_dir": null}"#).unwrap();
        assert!(config.data_dir.is_none());

        let config: AppConfig = serde_json::from_str(r#"{"data_dir": "/srv/careerhub"}"#).unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/srv/careerhub")));
    }

    #[test]
    fn test_partial_http_section() {
        let config: AppConfig =
            serde_json::from_str(r#"{"http": {"port": 9000, "cors_origins": []}}"#).unwrap();
        assert_eq!(config.http.address(), "127.0.0.1:9000");
        assert!(config.http.cors_origins.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_settings_validated() {
        let mut config = AppConfig::default();
        config.http.port = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = AppConfig::default();
        config.http.host = " ".into();
        assert!(config.validate().is_err());

        for origin in ["localhost:5173", "https://app.school.edu/", "http://bad\norigin"] {
            let mut config = AppConfig::default();
            config.http.cors_origins = vec![origin.to_string()];
            assert!(config.validate().is_err(), "{} accepted", origin);
        }

        let mut config = AppConfig::default();
        config.http.cors_origins = vec!["https://careers.school.edu".into()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut config = AppConfig::default();
        config.auth.token_ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_grading_temperature_bounds() {
        let mut config = AppConfig::default();
        config.grading = Some(GradingConfig {
            temperature: 3.5,
            ..GradingConfig::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_only_touch_configured_sections() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            ENV_JWT_SECRET => Some("a-much-longer-production-secret".to_string()),
            ENV_AI_API_KEY => Some("sk-test".to_string()),
            _ => None,
        });

        assert_eq!(config.auth.jwt_secret, "a-much-longer-production-secret");
        // No grading section configured, so the key has nowhere to go
        assert!(config.grading.is_none());
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("careerhub.json");

        AppConfig::write_default(&path).unwrap();
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.http.port, 4000);
        assert_eq!(loaded.data_dir, Some(PathBuf::from("./data")));

        assert!(matches!(
            AppConfig::write_default(&path),
            Err(ConfigError::AlreadyExists(_))
        ));
    }
}
