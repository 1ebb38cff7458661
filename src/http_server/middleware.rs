//! Route access middleware
//!
//! Runs in front of every route. Looks the request up in the allow-list,
//! authenticates the bearer token when the route is not public, and hands
//! the resulting [`AuthContext`](crate::auth::AuthContext) to handlers
//! through request extensions.

use axum::extract::{OriginalUri, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, warn};

use super::errors::ApiError;
use super::state::AppState;
use crate::auth::access;
use crate::auth::AuthError;

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn authorize(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = match req.extensions().get::<OriginalUri>() {
        Some(uri) => uri.0.path().to_string(),
        None => req.uri().path().to_string(),
    };

    let rule = access::lookup(req.method(), &path)
        .ok_or_else(|| ApiError::NotFound(format!("No route for {} {}", req.method(), path)))?;

    if rule.audience.is_public() {
        return Ok(next.run(req).await);
    }

    let ctx = {
        let token =
            extract_bearer_token(req.headers()).ok_or(AuthError::AuthenticationRequired)?;
        state.auth.authenticate(token)?
    };

    if !rule.audience.admits(ctx.role) {
        warn!(
            user_id = %ctx.user_id,
            role = %ctx.role,
            method = %req.method(),
            path = %path,
            "role not allowed on route"
        );
        return Err(AuthError::Forbidden.into());
    }

    debug!(user_id = %ctx.user_id, role = %ctx.role, path = %path, "request authorized");
    req.extensions_mut().insert(ctx);
    Ok(next.run(req).await)
}
