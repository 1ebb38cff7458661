//! Auth HTTP Routes
//!
//! Registration, login and the caller's own account.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::errors::ApiResult;
use super::extract::ApiJson;
use super::state::AppState;
use crate::auth::api::{AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::auth::{AuthContext, UserResponse};

/// Auth routes with shared state
pub fn auth_routes(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/me", get(me_handler))
        .route("/change-password", post(change_password_handler))
        .with_state(state)
}

async fn register_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.auth.register(request)?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(state.auth.login(request)?))
}

async fn me_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<UserResponse>> {
    let user = state.auth.current_user(ctx.user_id)?;
    Ok(Json(UserResponse::from(user)))
}

async fn change_password_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    state
        .auth
        .change_password(ctx.user_id, &request.current_password, &request.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
