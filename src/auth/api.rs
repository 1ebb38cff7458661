//! # Auth Service
//!
//! Registration, login, token checks and teacher invites on top of the
//! document store.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::access::AuthContext;
use super::crypto::{constant_time_str_eq, generate_code, normalize_code, PasswordPolicy};
use super::email::{EmailSender, EmailTemplate};
use super::errors::{AuthError, AuthResult};
use super::jwt::{JwtConfig, JwtManager};
use super::user::{normalize_email, Role, User, UserResponse};
use crate::config::AuthConfig;
use crate::model::{optional_text, Invite, INVITE_CODE_LENGTH};
use crate::store::{Database, StoreError};

/// Attempts at drawing an unused invite code before giving up
const CODE_ATTEMPTS: usize = 5;

/// Auth service combining users, tokens and invites
pub struct AuthService {
    db: Arc<Database>,
    jwt_manager: JwtManager,
    password_policy: PasswordPolicy,
    email_sender: Arc<dyn EmailSender>,
    invite_ttl: Duration,
}

impl AuthService {
    pub fn new(
        db: Arc<Database>,
        config: &AuthConfig,
        email_sender: Arc<dyn EmailSender>,
        invite_ttl_days: i64,
    ) -> Self {
        Self {
            db,
            jwt_manager: JwtManager::new(JwtConfig::from(config)),
            password_policy: PasswordPolicy::with_min_length(config.min_password_length),
            email_sender,
            invite_ttl: Duration::days(invite_ttl_days),
        }
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.password_policy
    }

    /// Register a new account.
    ///
    /// Without an invite code the account is a student, optionally joining a
    /// section by its join code. A valid invite issued to the same email
    /// makes the account a teacher and is consumed.
    pub fn register(&self, request: RegisterRequest) -> AuthResult<AuthResponse> {
        let email = normalize_email(&request.email)?;

        let invite = match optional_text(request.invite_code.as_deref()) {
            Some(code) => {
                let invite = self.find_redeemable_invite(&code)?;
                if invite.email != email {
                    return Err(AuthError::InvalidInvite);
                }
                Some(invite)
            }
            None => None,
        };

        let role = if invite.is_some() {
            Role::Teacher
        } else {
            Role::Student
        };
        let mut user = User::new(
            &request.name,
            &email,
            role,
            &request.password,
            &self.password_policy,
        )?;

        if role == Role::Student {
            if let Some(code) = optional_text(request.join_code.as_deref()) {
                let code = normalize_code(&code);
                let section = self
                    .db
                    .sections
                    .find_one(|s| s.join_code == code)?
                    .ok_or_else(|| AuthError::InvalidInput("Unknown section code".into()))?;
                user.section_id = Some(section.id);
            }
        }

        let user = self.insert_user(user)?;

        if let Some(invite) = invite {
            let redeemed = self.db.invites.update(invite.id, |i| {
                if !i.is_redeemable(Utc::now()) {
                    return Err(AuthError::InvalidInvite);
                }
                i.redeem(user.id);
                Ok(())
            });

            // Another registration consumed the invite first
            if let Err(e) = redeemed {
                self.db.users.delete(user.id)?;
                return Err(e);
            }
        }

        info!(user_id = %user.id, role = %user.role, "user registered");
        self.issue(user)
    }

    /// Authenticate with email and password
    pub fn login(&self, request: LoginRequest) -> AuthResult<AuthResponse> {
        let email = normalize_email(&request.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .db
            .find_user_by_email(&email)?
            .ok_or(AuthError::InvalidCredentials)?;

        if !user.verify_password(&request.password)? {
            warn!(user_id = %user.id, "failed login");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id, role = %user.role, "user logged in");
        self.issue(user)
    }

    /// Resolve a bearer token to the caller's identity.
    ///
    /// The user must still exist with the role the token was issued for.
    pub fn authenticate(&self, token: &str) -> AuthResult<AuthContext> {
        let claims = self.jwt_manager.validate_token(token)?;
        let user_id = JwtManager::get_user_id(&claims)?;

        let user = self.db.users.get(user_id)?.ok_or(AuthError::StaleToken)?;
        if user.role != claims.role {
            return Err(AuthError::StaleToken);
        }

        Ok(AuthContext {
            user_id,
            email: user.email,
            role: user.role,
        })
    }

    pub fn current_user(&self, user_id: Uuid) -> AuthResult<User> {
        self.db.users.get(user_id)?.ok_or(AuthError::StaleToken)
    }

    /// Change password for the authenticated user and notify them
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        let mut user = self.current_user(user_id)?;

        if !user.verify_password(current_password)? {
            return Err(AuthError::InvalidInput(
                "Current password is incorrect".into(),
            ));
        }

        // Hash outside the collection lock
        user.update_password(new_password, &self.password_policy)?;
        let hash = user.password_hash;
        let updated_at = user.updated_at;
        self.db.users.update(user_id, |u| {
            u.password_hash = hash;
            u.updated_at = updated_at;
            Ok::<_, AuthError>(())
        })?;

        info!(user_id = %user_id, "password changed");

        if let Err(e) = self
            .email_sender
            .send(EmailTemplate::PasswordChanged { to: user.email })
            .await
        {
            warn!(user_id = %user_id, error = %e, "password change notice not sent");
        }

        Ok(())
    }

    /// Create an administrator; used to bootstrap a fresh install
    pub fn create_admin(&self, name: &str, email: &str, password: &str) -> AuthResult<User> {
        let user = User::new(name, email, Role::Admin, password, &self.password_policy)?;
        let user = self.insert_user(user)?;
        info!(user_id = %user.id, "admin created");
        Ok(user)
    }

    /// Issue a teacher invite and email its code.
    ///
    /// If the email cannot be sent the invite is removed again. Once sent,
    /// older pending invites for the same address are dropped.
    pub async fn create_invite(&self, created_by: Uuid, email: &str) -> AuthResult<Invite> {
        let email = normalize_email(email)?;

        if self.db.find_user_by_email(&email)?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let invite = self.insert_invite(created_by, &email)?;

        let sent = self
            .email_sender
            .send(EmailTemplate::TeacherInvite {
                to: invite.email.clone(),
                code: invite.code.clone(),
                expires_at: invite.expires_at,
            })
            .await;

        if let Err(e) = sent {
            warn!(invite_id = %invite.id, error = %e, "invite email failed, rolling back");
            self.db.invites.delete(invite.id)?;
            return Err(e);
        }

        let now = Utc::now();
        let replaced = self.db.invites.delete_where(|i| {
            i.id != invite.id && i.email == invite.email && i.is_redeemable(now)
        })?;

        info!(
            invite_id = %invite.id,
            created_by = %created_by,
            replaced,
            "teacher invite sent"
        );
        Ok(invite)
    }

    /// Check an invite code without consuming it
    pub fn verify_invite(&self, code: &str) -> AuthResult<InviteCheck> {
        let invite = self.find_redeemable_invite(code)?;
        Ok(InviteCheck {
            valid: true,
            email: invite.email,
            expires_at: invite.expires_at,
        })
    }

    fn find_redeemable_invite(&self, code: &str) -> AuthResult<Invite> {
        let code = normalize_code(code);
        let now = Utc::now();

        self.db
            .invites
            .find_one(|i| constant_time_str_eq(&i.code, &code) && i.is_redeemable(now))?
            .ok_or(AuthError::InvalidInvite)
    }

    fn insert_invite(&self, created_by: Uuid, email: &str) -> AuthResult<Invite> {
        for _ in 0..CODE_ATTEMPTS {
            let invite = Invite::new(
                generate_code(INVITE_CODE_LENGTH),
                email.to_string(),
                created_by,
                self.invite_ttl,
            );
            let code = invite.code.clone();

            match self
                .db
                .invites
                .insert_unique(invite, |i| i.code == code, "Invite code taken")
            {
                Ok(invite) => return Ok(invite),
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AuthError::StorageError("could not allocate an invite code".into()))
    }

    fn insert_user(&self, user: User) -> AuthResult<User> {
        let email = user.email.clone();
        self.db
            .users
            .insert_unique(user, |u| u.email == email, "Email already registered")
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::EmailAlreadyExists,
                other => other.into(),
            })
    }

    fn issue(&self, user: User) -> AuthResult<AuthResponse> {
        let issued = self.jwt_manager.generate_access_token(&user)?;
        Ok(AuthResponse {
            user: UserResponse::from(user),
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }
}

// ==================
// HTTP Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub invite_code: Option<String>,
    /// Section join code, students only
    #[serde(default)]
    pub join_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InviteCheck {
    pub valid: bool,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}
