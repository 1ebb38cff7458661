//! Shared handler state

use std::sync::Arc;

use crate::auth::{AuthService, EmailSender};
use crate::config::AppConfig;
use crate::grading::{GradingClient, GradingConfig};
use crate::store::Database;

/// Cloned into every handler; everything inside is behind an `Arc`
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub auth: Arc<AuthService>,
    /// `None` when no model endpoint is configured
    pub grader: Option<Arc<GradingClient>>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        db: Arc<Database>,
        email_sender: Arc<dyn EmailSender>,
        grader: Option<GradingClient>,
    ) -> Self {
        let auth = AuthService::new(
            db.clone(),
            &config.auth,
            email_sender,
            config.invite_ttl_days,
        );

        Self {
            db,
            auth: Arc::new(auth),
            grader: grader.map(Arc::new),
            config: Arc::new(config),
        }
    }

    /// Character cap applied to documents before prompting
    pub fn max_content_chars(&self) -> usize {
        self.config
            .grading
            .as_ref()
            .map(|g| g.max_content_chars)
            .unwrap_or_else(|| GradingConfig::default().max_content_chars)
    }
}
