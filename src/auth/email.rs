//! # Email Integration
//!
//! Outgoing mail for teacher invites and account notices.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::errors::{AuthError, AuthResult};

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// Empty means an unauthenticated local relay
    #[serde(default)]
    pub smtp_user: String,

    /// Usually supplied via `CAREERHUB_SMTP_PASSWORD`
    #[serde(default, skip_serializing)]
    pub smtp_password: String,

    pub from_email: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Dashboard URL used in links
    #[serde(default = "default_app_url")]
    pub app_url: String,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_name() -> String {
    "CareerHub".to_string()
}

fn default_app_url() -> String {
    "http://localhost:5173".to_string()
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "localhost".to_string(),
            smtp_port: 1025,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_email: "noreply@careerhub.local".to_string(),
            from_name: default_from_name(),
            app_url: default_app_url(),
        }
    }
}

/// Email template types
#[derive(Debug, Clone, PartialEq)]
pub enum EmailTemplate {
    /// Invite code letting a teacher register
    TeacherInvite {
        to: String,
        code: String,
        expires_at: DateTime<Utc>,
    },

    /// Password changed notification
    PasswordChanged { to: String },
}

impl EmailTemplate {
    pub fn recipient(&self) -> &str {
        match self {
            EmailTemplate::TeacherInvite { to, .. } => to,
            EmailTemplate::PasswordChanged { to } => to,
        }
    }

    /// Render into (recipient, subject, body)
    pub fn render(&self, app_url: &str) -> (String, String, String) {
        match self {
            EmailTemplate::TeacherInvite {
                to,
                code,
                expires_at,
            } => {
                let subject = "You're invited to join CareerHub as a teacher".to_string();
                let body = format!(
                    "Hello,\n\n\
                    You have been invited to join CareerHub as a teacher.\n\n\
                    Your invite code is: {}\n\n\
                    Register at {}/register using this email address and the code above.\n\
                    The code expires on {}.\n\n\
                    If you weren't expecting this, you can ignore this email.\n\n\
                    Thanks,\n\
                    The CareerHub Team",
                    code,
                    app_url,
                    expires_at.format("%Y-%m-%d %H:%M UTC")
                );
                (to.clone(), subject, body)
            }
            EmailTemplate::PasswordChanged { to } => {
                let subject = "Your password was changed".to_string();
                let body = "Hello,\n\n\
                    Your CareerHub password was successfully changed.\n\n\
                    If you didn't make this change, please contact your administrator immediately.\n\n\
                    Thanks,\n\
                    The CareerHub Team"
                    .to_string();
                (to.clone(), subject, body)
            }
        }
    }
}

pub type SendFuture<'a> = Pin<Box<dyn Future<Output = AuthResult<()>> + Send + 'a>>;

/// Email sender trait for abstraction
pub trait EmailSender: Send + Sync {
    fn send(&self, template: EmailTemplate) -> SendFuture<'_>;
}

/// Records messages instead of sending them.
///
/// Used when no SMTP server is configured and in tests.
#[derive(Debug, Default)]
pub struct MockEmailSender {
    pub sent: RwLock<Vec<EmailTemplate>>,
    /// Makes every send fail, for exercising rollback paths
    pub fail: bool,
}

impl MockEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<EmailTemplate> {
        self.sent.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, template: EmailTemplate) -> SendFuture<'_> {
        Box::pin(async move {
            if self.fail {
                return Err(AuthError::EmailError("mock sender configured to fail".into()));
            }
            info!(to = template.recipient(), "email recorded (no SMTP configured)");
            self.sent
                .write()
                .map_err(|_| AuthError::EmailError("Lock poisoned".into()))?
                .push(template);
            Ok(())
        })
    }
}

/// SMTP email sender
pub struct SmtpEmailSender {
    config: EmailConfig,
}

impl SmtpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    async fn deliver(&self, template: EmailTemplate) -> AuthResult<()> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let (to, subject, body) = template.render(&self.config.app_url);

        let email = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_email)
                    .parse()
                    .map_err(|e| AuthError::EmailError(format!("Invalid from address: {}", e)))?,
            )
            .to(to
                .parse()
                .map_err(|e| AuthError::EmailError(format!("Invalid to address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| AuthError::EmailError(format!("Failed to build email: {}", e)))?;

        let mailer = if self.config.smtp_user.is_empty() {
            // Local development relay, no TLS or auth
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
                .port(self.config.smtp_port)
                .build()
        } else {
            let creds = Credentials::new(
                self.config.smtp_user.clone(),
                self.config.smtp_password.clone(),
            );

            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| AuthError::EmailError(format!("SMTP relay error: {}", e)))?
                .credentials(creds)
                .port(self.config.smtp_port)
                .build()
        };

        mailer
            .send(email)
            .await
            .map_err(|e| AuthError::EmailError(format!("Failed to send email: {}", e)))?;

        info!(to = %to, "email sent");
        Ok(())
    }
}

impl EmailSender for SmtpEmailSender {
    fn send(&self, template: EmailTemplate) -> SendFuture<'_> {
        Box::pin(self.deliver(template))
    }
}

/// Pick the sender for this configuration
pub fn create_email_sender(config: Option<EmailConfig>) -> Arc<dyn EmailSender> {
    match config {
        Some(cfg) => Arc::new(SmtpEmailSender::new(cfg)),
        None => Arc::new(MockEmailSender::new()),
    }
}
