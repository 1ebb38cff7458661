//! # Auth Errors
//!
//! Error types for the authentication module.

use thiserror::Error;

use crate::store::StoreError;

/// Result type for auth operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Authentication and authorization errors
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // ==================
    // Authentication Errors
    // ==================
    /// Unknown email or wrong password (generic - don't leak whether email exists)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already registered")]
    EmailAlreadyExists,

    /// Password does not meet requirements
    #[error("Password does not meet requirements: {0}")]
    WeakPassword(String),

    /// Registration field missing or malformed
    #[error("{0}")]
    InvalidInput(String),

    /// Invite code unknown, used, expired, or issued to another email
    #[error("Invalid or expired invite code")]
    InvalidInvite,

    // ==================
    // Token Errors
    // ==================
    /// Token is malformed
    #[error("Malformed token")]
    MalformedToken,

    /// Token has expired
    #[error("Token expired")]
    TokenExpired,

    /// Token signature is invalid
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token refers to a deleted user or a stale role
    #[error("Session is no longer valid")]
    StaleToken,

    // ==================
    // Access Errors
    // ==================
    /// No bearer token on a protected route
    #[error("Authentication required")]
    AuthenticationRequired,

    /// Role not allowed on this route, or not the owner of the resource
    #[error("Not authorized to access this resource")]
    Forbidden,

    // ==================
    // Internal Errors
    // ==================
    /// Password hashing failed
    #[error("Internal error: password hashing failed")]
    HashingFailed,

    /// Token generation failed
    #[error("Internal error: token generation failed")]
    TokenGenerationFailed,

    /// Storage operation failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Mail delivery failed
    #[error("Email delivery failed: {0}")]
    EmailError(String),
}

impl AuthError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request
            AuthError::WeakPassword(_) => 400,
            AuthError::InvalidInput(_) => 400,
            AuthError::InvalidInvite => 400,

            // 401 Unauthorized
            AuthError::InvalidCredentials => 401,
            AuthError::MalformedToken => 401,
            AuthError::TokenExpired => 401,
            AuthError::InvalidSignature => 401,
            AuthError::StaleToken => 401,
            AuthError::AuthenticationRequired => 401,

            // 403 Forbidden
            AuthError::Forbidden => 403,

            // 409 Conflict
            AuthError::EmailAlreadyExists => 409,

            // 502 Bad Gateway
            AuthError::EmailError(_) => 502,

            // 500 Internal Server Error
            AuthError::HashingFailed => 500,
            AuthError::TokenGenerationFailed => 500,
            AuthError::StorageError(_) => 500,
        }
    }

    /// Returns whether this error should be logged at warn level
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        AuthError::StorageError(err.to_string())
    }
}
