//! User management routes
//!
//! Admins see and edit everyone. Teachers may list and read the students of
//! their own sections.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::extract::{nullable, ApiJson, ApiPath, ApiQuery};
use super::guards::{ensure_can_view_student, visible_student_ids};
use super::state::AppState;
use crate::auth::user::{normalize_email, validate_name};
use crate::auth::{AuthContext, AuthError, Role, UserResponse};

pub fn user_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_users_handler))
        .route(
            "/:id",
            get(get_user_handler)
                .patch(update_user_handler)
                .delete(delete_user_handler),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub section_id: Option<Uuid>,
    /// Case-insensitive match on name or email
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    #[serde(default, deserialize_with = "nullable")]
    pub section_id: Option<Option<Uuid>>,
}

async fn list_users_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(filter): ApiQuery<UserFilter>,
) -> ApiResult<Json<Value>> {
    let visible = visible_student_ids(&state.db, &ctx)?;
    let needle = filter
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut users = state.db.users.find(|u| {
        visible.as_ref().map_or(true, |ids| ids.contains(&u.id))
            && filter.role.map_or(true, |r| u.role == r)
            && filter.section_id.map_or(true, |s| u.section_id == Some(s))
            && needle.as_ref().map_or(true, |n| {
                u.name.to_lowercase().contains(n.as_str()) || u.email.contains(n.as_str())
            })
    })?;
    users.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let users: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(json!({ "total": users.len(), "users": users })))
}

async fn get_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let user = state
        .db
        .users
        .get(id)?
        .ok_or_else(|| ApiError::not_found("User"))?;

    if !ctx.is_admin() {
        ensure_can_view_student(&state.db, &ctx, id)?;
    }

    Ok(Json(UserResponse::from(user)))
}

async fn update_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    let current = state
        .db
        .users
        .get(id)?
        .ok_or_else(|| ApiError::not_found("User"))?;

    let name = request.name.as_deref().map(validate_name).transpose()?;

    let email = request.email.as_deref().map(normalize_email).transpose()?;
    if let Some(email) = &email {
        let taken = state
            .db
            .find_user_by_email(email)?
            .map_or(false, |other| other.id != id);
        if taken {
            return Err(AuthError::EmailAlreadyExists.into());
        }
    }

    if let Some(role) = request.role {
        if id == ctx.user_id && role != current.role {
            return Err(ApiError::bad_request("You cannot change your own role"));
        }
    }

    let final_role = request.role.unwrap_or(current.role);
    if let Some(Some(section_id)) = request.section_id {
        if final_role != Role::Student {
            return Err(ApiError::bad_request("Only students can belong to a section"));
        }
        if state.db.sections.get(section_id)?.is_none() {
            return Err(ApiError::not_found("Section"));
        }
    }

    let updated = state.db.users.update(id, |user| {
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(email) = email {
            user.email = email;
        }
        if let Some(section_id) = request.section_id {
            user.section_id = section_id;
        }
        if let Some(role) = request.role {
            user.set_role(role);
        }
        user.updated_at = Utc::now();
        Ok::<_, ApiError>(user.clone())
    })?;

    info!(
        user_id = %id,
        by = %ctx.user_id,
        role = %updated.role,
        "user updated"
    );
    Ok(Json(UserResponse::from(updated)))
}

async fn delete_user_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    if id == ctx.user_id {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }

    state.db.delete_user(id)?;
    Ok(StatusCode::NO_CONTENT)
}
