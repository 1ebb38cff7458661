//! Section routes
//!
//! Admins create and edit sections. Teachers manage the rosters of the
//! sections they lead, and students join one section with its code.

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

use super::errors::{ApiError, ApiResult};
use super::extract::{nullable, ApiJson, ApiPath};
use super::guards::ensure_manages_section;
use super::state::AppState;
use crate::auth::crypto::{generate_code, normalize_code};
use crate::auth::{AuthContext, Role, UserResponse};
use crate::model::{required_text, Section, JOIN_CODE_LENGTH};
use crate::store::{Database, StoreError};

const CODE_ATTEMPTS: usize = 5;

pub fn section_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_sections_handler).post(create_section_handler))
        .route("/join", post(join_section_handler))
        .route(
            "/:id",
            get(get_section_handler)
                .patch(update_section_handler)
                .delete(delete_section_handler),
        )
        .route("/:id/students", post(add_student_handler))
        .route("/:id/students/:student_id", delete(remove_student_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateSectionRequest {
    pub name: String,
    #[serde(default)]
    pub teacher_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub teacher_id: Option<Option<Uuid>>,
    /// Issue a fresh join code, invalidating the old one
    #[serde(default)]
    pub regenerate_code: bool,
}

#[derive(Debug, Deserialize)]
pub struct JoinSectionRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct AddStudentRequest {
    pub student_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SectionView {
    #[serde(flatten)]
    pub section: Section,
    pub teacher_name: Option<String>,
    pub student_count: usize,
    /// Roster, for staff only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<UserResponse>>,
}

fn section_view(db: &Database, section: Section, with_roster: bool) -> ApiResult<SectionView> {
    let teacher_name = match section.teacher_id {
        Some(id) => db.users.get(id)?.map(|t| t.name),
        None => None,
    };

    let mut students = db.section_students(section.id)?;
    students.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    let student_count = students.len();

    let students: Option<Vec<UserResponse>> =
        with_roster.then(|| students.into_iter().map(UserResponse::from).collect());

    Ok(SectionView {
        section,
        teacher_name,
        student_count,
        students,
    })
}

fn require_section(db: &Database, id: Uuid) -> ApiResult<Section> {
    db.sections
        .get(id)?
        .ok_or_else(|| ApiError::not_found("Section"))
}

/// The teacher a section is assigned to must exist and be a teacher
fn check_teacher(db: &Database, teacher_id: Uuid) -> ApiResult<()> {
    match db.users.get(teacher_id)? {
        Some(user) if user.role == Role::Teacher => Ok(()),
        Some(_) => Err(ApiError::bad_request("Assigned user is not a teacher")),
        None => Err(ApiError::not_found("Teacher")),
    }
}

/// Draw join codes until one is unused, then insert the section
fn insert_section(db: &Database, name: String, teacher_id: Option<Uuid>) -> ApiResult<Section> {
    for _ in 0..CODE_ATTEMPTS {
        let section = Section::new(name.clone(), teacher_id, generate_code(JOIN_CODE_LENGTH));
        let code = section.join_code.clone();

        match db
            .sections
            .insert_unique(section, |s| s.join_code == code, "Join code taken")
        {
            Ok(section) => return Ok(section),
            Err(StoreError::Conflict(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(ApiError::Store(StoreError::Conflict(
        "Could not allocate a join code".into(),
    )))
}

fn unused_join_code(db: &Database) -> ApiResult<String> {
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_code(JOIN_CODE_LENGTH);
        if db.sections.find_one(|s| s.join_code == code)?.is_none() {
            return Ok(code);
        }
    }

    Err(ApiError::Store(StoreError::Conflict(
        "Could not allocate a join code".into(),
    )))
}

async fn list_sections_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> ApiResult<Json<Value>> {
    let mut sections = match ctx.role {
        Role::Admin => state.db.sections.list()?,
        Role::Teacher => state.db.sections.find(|s| s.is_taught_by(ctx.user_id))?,
        Role::Student => {
            let me = state.auth.current_user(ctx.user_id)?;
            match me.section_id {
                Some(id) => state.db.sections.get(id)?.into_iter().collect(),
                None => Vec::new(),
            }
        }
    };
    sections.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

    let sections = sections
        .into_iter()
        .map(|s| section_view(&state.db, s, false))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(json!({ "total": sections.len(), "sections": sections })))
}

async fn create_section_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreateSectionRequest>,
) -> ApiResult<(StatusCode, Json<SectionView>)> {
    let name = required_text("Name", &request.name, 100).map_err(ApiError::BadRequest)?;
    if let Some(teacher_id) = request.teacher_id {
        check_teacher(&state.db, teacher_id)?;
    }

    let section = insert_section(&state.db, name, request.teacher_id)?;
    info!(section_id = %section.id, by = %ctx.user_id, "section created");

    let view = section_view(&state.db, section, true)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn join_section_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<JoinSectionRequest>,
) -> ApiResult<Json<SectionView>> {
    let code = normalize_code(&request.code);
    let section = state
        .db
        .sections
        .find_one(|s| s.join_code == code)?
        .ok_or_else(|| ApiError::not_found("Section with that code"))?;

    state.db.users.update(ctx.user_id, |u| {
        u.section_id = Some(section.id);
        u.updated_at = Utc::now();
        Ok::<_, ApiError>(())
    })?;

    info!(student_id = %ctx.user_id, section_id = %section.id, "student joined section");
    Ok(Json(section_view(&state.db, section, false)?))
}

async fn get_section_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<SectionView>> {
    let section = require_section(&state.db, id)?;

    let with_roster = if ctx.is_student() {
        let me = state.auth.current_user(ctx.user_id)?;
        if me.section_id != Some(id) {
            return Err(ApiError::forbidden("Not your section"));
        }
        false
    } else {
        ensure_manages_section(&ctx, &section)?;
        true
    };

    Ok(Json(section_view(&state.db, section, with_roster)?))
}

async fn update_section_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateSectionRequest>,
) -> ApiResult<Json<SectionView>> {
    require_section(&state.db, id)?;

    let name = request
        .name
        .as_deref()
        .map(|n| required_text("Name", n, 100))
        .transpose()
        .map_err(ApiError::BadRequest)?;
    if let Some(Some(teacher_id)) = request.teacher_id {
        check_teacher(&state.db, teacher_id)?;
    }
    let join_code = if request.regenerate_code {
        Some(unused_join_code(&state.db)?)
    } else {
        None
    };

    let section = state.db.sections.update(id, |s| {
        if let Some(name) = name {
            s.name = name;
        }
        if let Some(teacher_id) = request.teacher_id {
            s.teacher_id = teacher_id;
        }
        if let Some(code) = join_code {
            s.join_code = code;
        }
        s.updated_at = Utc::now();
        Ok::<_, ApiError>(s.clone())
    })?;

    Ok(Json(section_view(&state.db, section, true)?))
}

async fn delete_section_handler(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    state.db.delete_section(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_student_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AddStudentRequest>,
) -> ApiResult<Json<UserResponse>> {
    let section = require_section(&state.db, id)?;
    ensure_manages_section(&ctx, &section)?;

    let student = state.db.users.update(request.student_id, |u| {
        if u.role != Role::Student {
            return Err(ApiError::bad_request("Only students can join a section"));
        }
        u.section_id = Some(section.id);
        u.updated_at = Utc::now();
        Ok(u.clone())
    })?;

    info!(student_id = %student.id, section_id = %section.id, by = %ctx.user_id, "student added to section");
    Ok(Json(UserResponse::from(student)))
}

async fn remove_student_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath((id, student_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    let section = require_section(&state.db, id)?;
    ensure_manages_section(&ctx, &section)?;

    state.db.users.update(student_id, |u| {
        if u.section_id != Some(section.id) {
            return Err(ApiError::not_found("Student in this section"));
        }
        u.section_id = None;
        u.updated_at = Utc::now();
        Ok(())
    })?;

    info!(student_id = %student_id, section_id = %section.id, by = %ctx.user_id, "student removed from section");
    Ok(StatusCode::NO_CONTENT)
}
