//! # Auth Module
//!
//! Password accounts with one role each, signed bearer tokens, the route
//! allow-list and the invite mail that lets teachers sign up.

pub mod access;
pub mod api;
pub mod crypto;
pub mod email;
pub mod errors;
pub mod jwt;
pub mod user;

pub use access::{AuthContext, Audience};
pub use api::AuthService;
pub use email::{create_email_sender, EmailConfig, EmailSender, MockEmailSender};
pub use errors::{AuthError, AuthResult};
pub use jwt::{JwtClaims, JwtManager};
pub use user::{Role, User, UserResponse};
