//! # JWT Token Management
//!
//! Signed bearer tokens issued at login and registration.
//!
//! ## Invariants
//! - Validation is stateless; the service re-checks the user afterwards
//! - No secrets in the token (id, email and role only)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{AuthError, AuthResult};
use super::user::{Role, User};
use crate::config::AuthConfig;

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// Issued at (Unix epoch seconds)
    pub iat: i64,

    /// Expiration (Unix epoch seconds)
    pub exp: i64,

    pub aud: String,

    pub iss: String,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_ttl: Duration,
    pub issuer: String,
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        JwtConfig::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            access_token_ttl: Duration::hours(config.token_ttl_hours),
            issuer: config.issuer.clone(),
            audience: format!("{}-api", config.issuer),
        }
    }
}

/// An issued token and when it stops being accepted
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// JWT manager for token generation and validation
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Generate an access token for a user
    pub fn generate_access_token(&self, user: &User) -> AuthResult<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.config.access_token_ttl;

        let claims = JwtClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenGenerationFailed)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token's signature, expiry, issuer and audience
    pub fn validate_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AuthError::InvalidSignature
                    }
                    _ => AuthError::MalformedToken,
                }
            })?;

        Ok(token_data.claims)
    }

    pub fn get_user_id(claims: &JwtClaims) -> AuthResult<Uuid> {
        Uuid::parse_str(&claims.sub).map_err(|_| AuthError::MalformedToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::crypto::PasswordPolicy;

    fn test_config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_ttl: Duration::hours(1),
            issuer: "test".to_string(),
            audience: "test-api".to_string(),
        }
    }

    fn create_test_user() -> User {
        User::new(
            "Test Teacher",
            "teacher@example.com",
            Role::Teacher,
            "password123",
            &PasswordPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_token_round_trip_carries_role() {
        let manager = JwtManager::new(test_config("test_secret_key_for_testing_only"));
        let user = create_test_user();

        let issued = manager.generate_access_token(&user).unwrap();
        assert_eq!(issued.token.split('.').count(), 3);
        assert!(issued.expires_at > Utc::now());

        let claims = manager.validate_token(&issued.token).unwrap();
        assert_eq!(JwtManager::get_user_id(&claims).unwrap(), user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, Role::Teacher);
    }

    #[test]
    fn test_garbage_token_rejected() {
        let manager = JwtManager::new(test_config("test_secret_key_for_testing_only"));
        let result = manager.validate_token("invalid.token.here");
        assert!(matches!(
            result,
            Err(AuthError::MalformedToken) | Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let manager1 = JwtManager::new(test_config("secret_one_secret_one"));
        let manager2 = JwtManager::new(test_config("secret_two_secret_two"));

        let token = manager1
            .generate_access_token(&create_test_user())
            .unwrap()
            .token;
        assert!(matches!(
            manager2.validate_token(&token),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = "test_secret_key_for_testing_only";
        let now = Utc::now();
        let claims = JwtClaims {
            sub: Uuid::new_v4().to_string(),
            email: "old@example.com".to_string(),
            role: Role::Student,
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
            aud: "test-api".to_string(),
            iss: "test".to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        let manager = JwtManager::new(test_config(secret));
        assert!(matches!(
            manager.validate_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_does_not_contain_secrets() {
        let manager = JwtManager::new(test_config("test_secret_key_for_testing_only"));
        let user = create_test_user();

        let token = manager.generate_access_token(&user).unwrap().token;
        assert!(!token.contains("password"));
        assert!(!token.contains(&user.password_hash));
    }
}
