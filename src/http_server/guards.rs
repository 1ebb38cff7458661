//! Ownership checks shared by the entity routes.
//!
//! The allow-list decides which roles reach a handler; these decide which
//! records a teacher or student may touch once there.

use uuid::Uuid;

use super::errors::{ApiError, ApiResult};
use crate::auth::{AuthContext, Role};
use crate::model::Section;
use crate::store::{Database, StoreResult};

/// Whether the caller may see records belonging to `student_id`
pub fn can_view_student(db: &Database, ctx: &AuthContext, student_id: Uuid) -> StoreResult<bool> {
    match ctx.role {
        Role::Admin => Ok(true),
        Role::Teacher => db.teaches_student(ctx.user_id, student_id),
        Role::Student => Ok(ctx.user_id == student_id),
    }
}

pub fn ensure_can_view_student(db: &Database, ctx: &AuthContext, student_id: Uuid) -> ApiResult<()> {
    if can_view_student(db, ctx, student_id)? {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not your student"))
    }
}

/// Admins manage every section; teachers only the ones they lead
pub fn ensure_manages_section(ctx: &AuthContext, section: &Section) -> ApiResult<()> {
    if ctx.is_admin() || section.is_taught_by(ctx.user_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Not your section"))
    }
}

/// Students the caller can see. `None` means every student.
pub fn visible_student_ids(db: &Database, ctx: &AuthContext) -> StoreResult<Option<Vec<Uuid>>> {
    match ctx.role {
        Role::Admin => Ok(None),
        Role::Teacher => db.teacher_student_ids(ctx.user_id).map(Some),
        Role::Student => Ok(Some(vec![ctx.user_id])),
    }
}
