//! Submission routes
//!
//! Students submit documents; AI feedback arrives either from the browser
//! (`PUT /:id/feedback` with the raw model reply) or from the server calling
//! the configured model (`POST /:id/grade`). Teachers review afterwards.

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::extract::{ApiJson, ApiPath, ApiQuery};
use super::guards::{ensure_can_view_student, visible_student_ids};
use super::state::AppState;
use crate::auth::AuthContext;
use crate::grading::normalize::normalize_value;
use crate::grading::prompt::SYSTEM_PROMPT;
use crate::grading::{build_prompt, normalize_reply, GradingError};
use crate::model::{
    optional_text, required_text, Feedback, Job, Submission, SubmissionKind, SubmissionStatus,
};
use crate::store::Database;

const MAX_CONTENT_CHARS: usize = 100_000;

pub fn submission_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_submissions_handler).post(create_submission_handler))
        .route(
            "/:id",
            get(get_submission_handler).delete(delete_submission_handler),
        )
        .route("/:id/prompt", get(prompt_handler))
        .route("/:id/feedback", put(upload_feedback_handler))
        .route("/:id/grade", post(grade_handler))
        .route("/:id/review", patch(review_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SubmissionFilter {
    pub student_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub kind: Option<SubmissionKind>,
    pub job_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub kind: SubmissionKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub job_id: Option<Uuid>,
}

/// Either the model's raw text or an already-parsed object
#[derive(Debug, Deserialize)]
pub struct FeedbackUpload {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub feedback: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub comment: Option<String>,
    /// Overrides the AI score
    #[serde(default)]
    pub score: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub system_prompt: &'static str,
    pub prompt: String,
}

fn require_viewable(db: &Database, ctx: &AuthContext, id: Uuid) -> ApiResult<Submission> {
    let submission = db
        .submissions
        .get(id)?
        .ok_or_else(|| ApiError::not_found("Submission"))?;
    ensure_can_view_student(db, ctx, submission.student_id)?;
    Ok(submission)
}

fn target_job(db: &Database, submission: &Submission) -> ApiResult<Option<Job>> {
    match submission.job_id {
        Some(job_id) => Ok(db.jobs.get(job_id)?),
        None => Ok(None),
    }
}

fn store_feedback(db: &Database, id: Uuid, feedback: Feedback) -> ApiResult<Submission> {
    db.submissions.update(id, |s| {
        s.apply_feedback(feedback);
        Ok::<_, ApiError>(s.clone())
    })
}

async fn list_submissions_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(filter): ApiQuery<SubmissionFilter>,
) -> ApiResult<Json<Value>> {
    let visible = visible_student_ids(&state.db, &ctx)?;

    let mut submissions = state.db.submissions.find(|s| {
        visible.as_ref().map_or(true, |ids| ids.contains(&s.student_id))
            && filter.student_id.map_or(true, |id| s.student_id == id)
            && filter.status.map_or(true, |st| s.status == st)
            && filter.kind.map_or(true, |k| s.kind == k)
            && filter.job_id.map_or(true, |j| s.job_id == Some(j))
    })?;
    submissions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(json!({ "total": submissions.len(), "submissions": submissions })))
}

async fn create_submission_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiJson(request): ApiJson<CreateSubmissionRequest>,
) -> ApiResult<(StatusCode, Json<Submission>)> {
    let title = required_text("Title", &request.title, 200).map_err(ApiError::BadRequest)?;
    let content = required_text("Content", &request.content, MAX_CONTENT_CHARS)
        .map_err(ApiError::BadRequest)?;

    if let Some(job_id) = request.job_id {
        let me = state.auth.current_user(ctx.user_id)?;
        let visible = state
            .db
            .jobs
            .get(job_id)?
            .map_or(false, |job| job.is_visible_in(me.section_id));
        if !visible {
            return Err(ApiError::not_found("Job"));
        }
    }

    let submission = state.db.submissions.insert(Submission::new(
        ctx.user_id,
        request.job_id,
        request.kind,
        title,
        content,
    ))?;

    info!(
        submission_id = %submission.id,
        student_id = %ctx.user_id,
        kind = %submission.kind,
        "submission created"
    );
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn get_submission_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Submission>> {
    Ok(Json(require_viewable(&state.db, &ctx, id)?))
}

async fn delete_submission_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<StatusCode> {
    let submission = state
        .db
        .submissions
        .get(id)?
        .ok_or_else(|| ApiError::not_found("Submission"))?;

    if !ctx.is_admin() && submission.student_id != ctx.user_id {
        return Err(ApiError::forbidden("Not your submission"));
    }

    state.db.submissions.delete(id)?;
    info!(submission_id = %id, by = %ctx.user_id, "submission deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn prompt_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<PromptResponse>> {
    let submission = require_viewable(&state.db, &ctx, id)?;
    let job = target_job(&state.db, &submission)?;

    Ok(Json(PromptResponse {
        system_prompt: SYSTEM_PROMPT,
        prompt: build_prompt(&submission, job.as_ref(), state.max_content_chars()),
    }))
}

async fn upload_feedback_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(upload): ApiJson<FeedbackUpload>,
) -> ApiResult<Json<Submission>> {
    require_viewable(&state.db, &ctx, id)?;

    let feedback = match (upload.reply, upload.feedback) {
        (Some(reply), _) if !reply.trim().is_empty() => normalize_reply(&reply),
        (_, Some(value)) if !value.is_null() => normalize_value(&value),
        _ => {
            return Err(ApiError::bad_request(
                "Provide either `reply` (raw model text) or `feedback` (object)",
            ))
        }
    };

    let submission = store_feedback(&state.db, id, feedback)?;
    info!(
        submission_id = %id,
        by = %ctx.user_id,
        score = submission.feedback.as_ref().map(|f| f.score),
        "feedback stored"
    );
    Ok(Json(submission))
}

async fn grade_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<Submission>> {
    let grader = state.grader.clone().ok_or(GradingError::NotConfigured)?;

    let submission = require_viewable(&state.db, &ctx, id)?;
    let job = target_job(&state.db, &submission)?;
    let prompt = build_prompt(&submission, job.as_ref(), grader.config().max_content_chars);

    let reply = grader.complete(&prompt).await?;
    let submission = store_feedback(&state.db, id, normalize_reply(&reply))?;

    info!(
        submission_id = %id,
        by = %ctx.user_id,
        score = submission.feedback.as_ref().map(|f| f.score),
        "submission graded"
    );
    Ok(Json(submission))
}

async fn review_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> ApiResult<Json<Submission>> {
    require_viewable(&state.db, &ctx, id)?;

    let score = match request.score {
        Some(score) if !(0..=100).contains(&score) => {
            return Err(ApiError::bad_request("Score must be between 0 and 100"))
        }
        Some(score) => Some(score as u8),
        None => None,
    };
    let comment = optional_text(request.comment.as_deref());
    if comment.is_none() && score.is_none() {
        return Err(ApiError::bad_request("Provide a comment or a score"));
    }

    let submission = state.db.submissions.update(id, |s| {
        if score.is_some() && !s.is_graded() {
            return Err(ApiError::bad_request(
                "Cannot override the score of an ungraded submission",
            ));
        }
        s.apply_review(comment, score);
        Ok::<_, ApiError>(s.clone())
    })?;

    info!(submission_id = %id, teacher_id = %ctx.user_id, "submission reviewed");
    Ok(Json(submission))
}
