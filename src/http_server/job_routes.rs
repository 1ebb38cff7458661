//! Job posting routes
//!
//! A posting without a section is visible to everyone. A section-scoped
//! posting is visible to that section's students and teacher, to its
//! author, and to admins.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::extract::{nullable, ApiJson, ApiPath, ApiQuery};
use super::guards::ensure_manages_section;
use super::state::AppState;
use crate::auth::{AuthContext, Role};
use crate::model::{optional_text, required_text, Job};
use crate::store::Database;

const MAX_DESCRIPTION_CHARS: usize = 10_000;

pub fn job_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_jobs_handler).post(create_job_handler))
        .route(
            "/:id",
            get(get_job_handler)
                .patch(update_job_handler)
                .delete(delete_job_handler),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct JobFilter {
    pub section_id: Option<Uuid>,
    /// Hide postings whose deadline has passed
    #[serde(default)]
    pub open: bool,
    /// Case-insensitive match on title, company or location
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub apply_url: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub section_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub company: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<String>>,
    pub description: Option<String>,
    pub requirements: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub apply_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub deadline: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub section_id: Option<Option<Uuid>>,
}

/// Which postings the caller may see
enum Visibility {
    All,
    Sections { sections: Vec<Uuid>, author: Uuid },
}

impl Visibility {
    fn for_caller(db: &Database, ctx: &AuthContext) -> ApiResult<Self> {
        Ok(match ctx.role {
            Role::Admin => Visibility::All,
            Role::Teacher => Visibility::Sections {
                sections: db.teacher_section_ids(ctx.user_id)?,
                author: ctx.user_id,
            },
            Role::Student => {
                let me = db
                    .users
                    .get(ctx.user_id)?
                    .ok_or_else(|| ApiError::not_found("User"))?;
                Visibility::Sections {
                    sections: me.section_id.into_iter().collect(),
                    author: ctx.user_id,
                }
            }
        })
    }

    fn admits(&self, job: &Job) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Sections { sections, author } => {
                job.created_by == *author
                    || job.section_id.map_or(true, |s| sections.contains(&s))
            }
        }
    }
}

fn clean_requirements(requirements: Vec<String>) -> Vec<String> {
    requirements
        .into_iter()
        .filter_map(|r| optional_text(Some(&r)))
        .collect()
}

fn check_apply_url(url: &Option<String>) -> ApiResult<()> {
    match url {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => Err(
            ApiError::bad_request("Apply URL must start with http:// or https://"),
        ),
        _ => Ok(()),
    }
}

/// A posting may only be scoped to a section the caller manages
fn check_scope(db: &Database, ctx: &AuthContext, section_id: Option<Uuid>) -> ApiResult<()> {
    if let Some(section_id) = section_id {
        let section = db
            .sections
            .get(section_id)?
            .ok_or_else(|| ApiError::not_found("Section"))?;
        ensure_manages_section(ctx, &section)?;
    }
    Ok(())
}

fn require_editable(db: &Database, ctx: &AuthContext, id: Uuid) -> ApiResult<Job> {
    let job = db.jobs.get(id)?.ok_or_else(|| ApiError::not_found("Job"))?;
    if !ctx.is_admin() && job.created_by != ctx.user_id {
        return Err(ApiError::forbidden("Only the author can change this posting"));
    }
    Ok(job)
}

fn bad(message: String) -> ApiError {
    ApiError::BadRequest(message)
}

async fn list_jobs_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(filter): ApiQuery<JobFilter>,
) -> ApiResult<Json<Value>> {
    let visibility = Visibility::for_caller(&state.db, &ctx)?;
    let now = Utc::now();
    let needle = filter
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty());

    let mut jobs = state.db.jobs.find(|job| {
        visibility.admits(job)
            && filter.section_id.map_or(true, |s| job.section_id == Some(s))
            && (!filter.open || job.is_open(now))
            && needle.as_ref().map_or(true, |n| {
                job.title.to_lowercase().contains(n.as_str())
                    || job.company.to_lowercase().contains(n.as_str())
                    || job
                        .location
                        .as_ref()
                        .map_or(false, |l| l.to_lowercase().contains(n.as_str()))
            })
    })?;
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(json!({ "total": jobs.len(), "jobs": jobs })))
}

async fn create_job_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let title = required_text("Title", &request.title, 200).map_err(bad)?;
    let company = required_text("Company", &request.company, 200).map_err(bad)?;
    let description =
        required_text("Description", &request.description, MAX_DESCRIPTION_CHARS).map_err(bad)?;
    let apply_url = optional_text(request.apply_url.as_deref());
    check_apply_url(&apply_url)?;
    check_scope(&state.db, &ctx, request.section_id)?;

    let now = Utc::now();
    let job = state.db.jobs.insert(Job {
        id: Uuid::new_v4(),
        title,
        company,
        location: optional_text(request.location.as_deref()),
        description,
        requirements: clean_requirements(request.requirements),
        apply_url,
        deadline: request.deadline,
        section_id: request.section_id,
        created_by: ctx.user_id,
        created_at: now,
        updated_at: now,
    })?;

    info!(job_id = %job.id, by = %ctx.user_id, section_id = ?job.section_id, "job posted");
    Ok((StatusCode::CREATED, Json(job)))
}

async fn get_job_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Job>> {
    let visibility = Visibility::for_caller(&state.db, &ctx)?;
    // Hidden postings look missing
    let job = state
        .db
        .jobs
        .get(id)?
        .filter(|job| visibility.admits(job))
        .ok_or_else(|| ApiError::not_found("Job"))?;

    Ok(Json(job))
}

async fn update_job_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateJobRequest>,
) -> ApiResult<Json<Job>> {
    require_editable(&state.db, &ctx, id)?;

    let title = request
        .title
        .as_deref()
        .map(|t| required_text("Title", t, 200))
        .transpose()
        .map_err(bad)?;
    let company = request
        .company
        .as_deref()
        .map(|c| required_text("Company", c, 200))
        .transpose()
        .map_err(bad)?;
    let description = request
        .description
        .as_deref()
        .map(|d| required_text("Description", d, MAX_DESCRIPTION_CHARS))
        .transpose()
        .map_err(bad)?;
    let apply_url = request
        .apply_url
        .map(|url| optional_text(url.as_deref()));
    if let Some(url) = &apply_url {
        check_apply_url(url)?;
    }
    if let Some(section_id) = request.section_id {
        check_scope(&state.db, &ctx, section_id)?;
    }

    let job = state.db.jobs.update(id, |job| {
        if let Some(title) = title {
            job.title = title;
        }
        if let Some(company) = company {
            job.company = company;
        }
        if let Some(location) = request.location {
            job.location = optional_text(location.as_deref());
        }
        if let Some(description) = description {
            job.description = description;
        }
        if let Some(requirements) = request.requirements {
            job.requirements = clean_requirements(requirements);
        }
        if let Some(apply_url) = apply_url {
            job.apply_url = apply_url;
        }
        if let Some(deadline) = request.deadline {
            job.deadline = deadline;
        }
        if let Some(section_id) = request.section_id {
            job.section_id = section_id;
        }
        job.updated_at = Utc::now();
        Ok::<_, ApiError>(job.clone())
    })?;

    Ok(Json(job))
}

async fn delete_job_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    require_editable(&state.db, &ctx, id)?;

    // Submissions outlive the posting they targeted
    state.db.submissions.update_where(
        |s| s.job_id == Some(id),
        |s| s.job_id = None,
    )?;
    state.db.jobs.delete(id)?;

    info!(job_id = %id, by = %ctx.user_id, "job deleted");
    Ok(StatusCode::NO_CONTENT)
}
