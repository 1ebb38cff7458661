//! Dashboard statistics routes

use axum::{
    extract::{Extension, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use super::extract::ApiQuery;
use super::guards::{ensure_manages_section, visible_student_ids};
use super::state::AppState;
use crate::auth::AuthContext;
use crate::model::SubmissionKind;
use crate::stats::{overview, weakness_stats, Overview, WeaknessReport, DEFAULT_WEAKNESS_LIMIT};

pub fn stats_routes(state: AppState) -> Router {
    Router::new()
        .route("/weaknesses", get(weaknesses_handler))
        .route("/overview", get(overview_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct WeaknessQuery {
    pub limit: Option<usize>,
    /// Restrict to one section's students
    pub section_id: Option<Uuid>,
    pub kind: Option<SubmissionKind>,
}

async fn weaknesses_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    ApiQuery(query): ApiQuery<WeaknessQuery>,
) -> ApiResult<Json<WeaknessReport>> {
    let mut students = visible_student_ids(&state.db, &ctx)?;

    if let Some(section_id) = query.section_id {
        let section = state
            .db
            .sections
            .get(section_id)?
            .ok_or_else(|| ApiError::not_found("Section"))?;
        ensure_manages_section(&ctx, &section)?;

        let roster: Vec<Uuid> = state
            .db
            .section_students(section_id)?
            .into_iter()
            .map(|u| u.id)
            .collect();
        students = Some(roster);
    }

    let submissions = state.db.submissions.find(|s| {
        students.as_ref().map_or(true, |ids| ids.contains(&s.student_id))
            && query.kind.map_or(true, |k| s.kind == k)
    })?;

    let limit = query.limit.unwrap_or(DEFAULT_WEAKNESS_LIMIT);
    Ok(Json(weakness_stats(&submissions, limit)))
}

async fn overview_handler(State(state): State<AppState>) -> ApiResult<Json<Overview>> {
    Ok(Json(overview(&state.db)?))
}
