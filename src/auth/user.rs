//! # Users
//!
//! Every account has exactly one role. Students may belong to one section.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::crypto::{hash_password, validate_password, verify_password, PasswordPolicy};
use super::errors::{AuthError, AuthResult};
use crate::store::Document;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(AuthError::InvalidInput(format!("Unknown role: {}", other))),
        }
    }
}

/// User model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub name: String,

    /// Normalized (trimmed, lowercase) and unique
    pub email: String,

    pub role: Role,

    /// Section a student belongs to
    #[serde(default)]
    pub section_id: Option<Uuid>,

    /// Argon2id password hash (never plaintext). Kept out of API responses by
    /// [`UserResponse`]; serialized here so the store can persist it.
    pub password_hash: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Document for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl User {
    /// Create a new user with a freshly hashed password
    pub fn new(
        name: &str,
        email: &str,
        role: Role,
        password: &str,
        policy: &PasswordPolicy,
    ) -> AuthResult<Self> {
        let name = validate_name(name)?;
        let email = normalize_email(email)?;
        validate_password(password, policy)?;

        let password_hash = hash_password(password)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email,
            role,
            section_id: None,
            password_hash,
            created_at: now,
            updated_at: now,
        })
    }

    /// Verify a password against this user's stored hash
    pub fn verify_password(&self, password: &str) -> AuthResult<bool> {
        verify_password(password, &self.password_hash)
    }

    pub fn update_password(&mut self, new_password: &str, policy: &PasswordPolicy) -> AuthResult<()> {
        validate_password(new_password, policy)?;
        self.password_hash = hash_password(new_password)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Change role. Only students keep a section.
    pub fn set_role(&mut self, role: Role) {
        self.role = role;
        if role != Role::Student {
            self.section_id = None;
        }
        self.updated_at = Utc::now();
    }
}

/// Trim and lowercase an email, rejecting obviously malformed input.
pub fn normalize_email(email: &str) -> AuthResult<String> {
    let email = email.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AuthError::InvalidInput("A valid email is required".into()));
    }

    Ok(email)
}

pub fn validate_name(name: &str) -> AuthResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::InvalidInput("Name is required".into()));
    }
    if name.chars().count() > 100 {
        return Err(AuthError::InvalidInput(
            "Name must be at most 100 characters".into(),
        ));
    }
    Ok(name.to_string())
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub section_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            section_id: user.section_id,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> PasswordPolicy {
        PasswordPolicy::default()
    }

    #[test]
    fn test_user_creation() {
        let user = User::new(
            "  Ada Lovelace ",
            "Ada@Example.COM ",
            Role::Student,
            "password123",
            &default_policy(),
        )
        .unwrap();

        assert_eq!(user.name, "Ada Lovelace");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.role, Role::Student);
        assert_ne!(user.password_hash, "password123");
    }

    #[test]
    fn test_password_verification() {
        let user = User::new("A", "a@b.io", Role::Admin, "password123", &default_policy()).unwrap();

        assert!(user.verify_password("password123").unwrap());
        assert!(!user.verify_password("wrong_password").unwrap());
    }

    #[test]
    fn test_weak_password_rejected() {
        let result = User::new("A", "a@b.io", Role::Student, "short", &default_policy());
        assert!(matches!(result, Err(AuthError::WeakPassword(_))));
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email(" X@Y.org").unwrap(), "x@y.org");
        for bad in ["", "no-at-sign", "@domain.com", "a@nodot", "a@.com", "a b@c.com", "a@b.com."] {
            assert!(normalize_email(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_role_change_clears_section() {
        let mut user =
            User::new("S", "s@school.edu", Role::Student, "password123", &default_policy()).unwrap();
        user.section_id = Some(Uuid::new_v4());

        user.set_role(Role::Teacher);
        assert_eq!(user.role, Role::Teacher);
        assert!(user.section_id.is_none());
    }

    #[test]
    fn test_role_parsing_and_wire_format() {
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert!("janitor".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Student).unwrap(), "\"student\"");
    }

    #[test]
    fn test_response_omits_password_hash() {
        let user =
            User::new("A", "a@b.io", Role::Student, "password123", &default_policy()).unwrap();

        let json = serde_json::to_string(&UserResponse::from(&user)).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains(&user.password_hash));
    }
}
