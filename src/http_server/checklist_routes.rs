//! Student checklist routes
//!
//! Each student has one checklist, created with the default items the
//! first time it is read.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::extract::{ApiJson, ApiPath};
use super::guards::ensure_can_view_student;
use super::state::AppState;
use crate::auth::{AuthContext, Role};
use crate::model::{required_text, Checklist, ChecklistItem};
use crate::store::{Database, StoreError};

const MAX_LABEL_CHARS: usize = 200;

pub fn checklist_routes(state: AppState) -> Router {
    Router::new()
        .route("/me", get(my_checklist_handler))
        .route("/me/items", post(add_item_handler))
        .route(
            "/me/items/:item_id",
            patch(update_item_handler).delete(delete_item_handler),
        )
        .route("/:student_id", get(student_checklist_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub done: Option<bool>,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChecklistView {
    #[serde(flatten)]
    pub checklist: Checklist,
    /// Percent of items done, rounded down
    pub progress: u8,
}

impl From<Checklist> for ChecklistView {
    fn from(checklist: Checklist) -> Self {
        let progress = checklist.progress();
        Self {
            checklist,
            progress,
        }
    }
}

fn get_or_create(db: &Database, student_id: Uuid) -> ApiResult<Checklist> {
    if let Some(existing) = db.checklists.find_one(|c| c.student_id == student_id)? {
        return Ok(existing);
    }

    match db.checklists.insert_unique(
        Checklist::with_defaults(student_id),
        |c| c.student_id == student_id,
        "Checklist already exists",
    ) {
        Ok(created) => Ok(created),
        // Created concurrently
        Err(StoreError::Conflict(_)) => db
            .checklists
            .find_one(|c| c.student_id == student_id)?
            .ok_or_else(|| ApiError::not_found("Checklist")),
        Err(e) => Err(e.into()),
    }
}

fn label(raw: &str) -> ApiResult<String> {
    required_text("Label", raw, MAX_LABEL_CHARS).map_err(ApiError::BadRequest)
}

async fn my_checklist_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<ChecklistView>> {
    Ok(Json(get_or_create(&state.db, ctx.user_id)?.into()))
}

async fn add_item_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<AddItemRequest>,
) -> ApiResult<(StatusCode, Json<ChecklistView>)> {
    let text = label(&request.label)?;
    let checklist = get_or_create(&state.db, ctx.user_id)?;

    let checklist = state.db.checklists.update(checklist.id, |c| {
        c.items.push(ChecklistItem::new(text));
        c.touch();
        Ok::<_, ApiError>(c.clone())
    })?;

    Ok((StatusCode::CREATED, Json(checklist.into())))
}

async fn update_item_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(item_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateItemRequest>,
) -> ApiResult<Json<ChecklistView>> {
    let new_label = request.label.as_deref().map(label).transpose()?;
    let checklist = get_or_create(&state.db, ctx.user_id)?;

    let checklist = state.db.checklists.update(checklist.id, |c| {
        let item = c
            .item_mut(item_id)
            .ok_or_else(|| ApiError::not_found("Checklist item"))?;
        if let Some(done) = request.done {
            item.set_done(done);
        }
        if let Some(new_label) = new_label {
            item.label = new_label;
        }
        c.touch();
        Ok::<_, ApiError>(c.clone())
    })?;

    Ok(Json(checklist.into()))
}

async fn delete_item_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(item_id): ApiPath<Uuid>,
) -> ApiResult<Json<ChecklistView>> {
    let checklist = get_or_create(&state.db, ctx.user_id)?;

    let checklist = state.db.checklists.update(checklist.id, |c| {
        let before = c.items.len();
        c.items.retain(|i| i.id != item_id);
        if c.items.len() == before {
            return Err(ApiError::not_found("Checklist item"));
        }
        c.touch();
        Ok(c.clone())
    })?;

    Ok(Json(checklist.into()))
}

async fn student_checklist_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(student_id): ApiPath<Uuid>,
) -> ApiResult<Json<ChecklistView>> {
    let student = state
        .db
        .users
        .get(student_id)?
        .filter(|u| u.role == Role::Student)
        .ok_or_else(|| ApiError::not_found("Student"))?;
    ensure_can_view_student(&state.db, &ctx, student.id)?;

    Ok(Json(get_or_create(&state.db, student.id)?.into()))
}
