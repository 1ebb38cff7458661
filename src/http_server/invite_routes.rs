//! Teacher invite routes

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::errors::ApiResult;
use super::extract::{ApiJson, ApiPath};
use super::state::AppState;
use crate::auth::api::InviteCheck;
use crate::auth::AuthContext;
use crate::model::{Invite, InviteStatus};

pub fn invite_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_invites_handler).post(create_invite_handler))
        .route("/verify", post(verify_invite_handler))
        .route("/:id", delete(delete_invite_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyInviteRequest {
    pub code: String,
}

/// Invite with its derived status
#[derive(Debug, Serialize)]
pub struct InviteView {
    #[serde(flatten)]
    pub invite: Invite,
    pub status: InviteStatus,
}

impl From<Invite> for InviteView {
    fn from(invite: Invite) -> Self {
        let status = invite.status(Utc::now());
        Self { invite, status }
    }
}

async fn list_invites_handler(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let mut invites = state.db.invites.list()?;
    invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let invites: Vec<InviteView> = invites.into_iter().map(InviteView::from).collect();
    Ok(Json(json!({ "total": invites.len(), "invites": invites })))
}

async fn create_invite_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreateInviteRequest>,
) -> ApiResult<(StatusCode, Json<InviteView>)> {
    let invite = state.auth.create_invite(ctx.user_id, &request.email).await?;
    Ok((StatusCode::CREATED, Json(InviteView::from(invite))))
}

async fn verify_invite_handler(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyInviteRequest>,
) -> ApiResult<Json<InviteCheck>> {
    Ok(Json(state.auth.verify_invite(&request.code)?))
}

async fn delete_invite_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let invite = state.db.invites.delete(id)?;
    info!(invite_id = %invite.id, by = %ctx.user_id, "invite revoked");
    Ok(StatusCode::NO_CONTENT)
}
