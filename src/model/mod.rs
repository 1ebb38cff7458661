//! # Domain Records
//!
//! Flat documents referencing each other by id. Users live in
//! [`crate::auth::user`] next to the credential logic.

pub mod checklist;
pub mod invite;
pub mod job;
pub mod section;
pub mod submission;

pub use checklist::{Checklist, ChecklistItem};
pub use invite::{Invite, InviteStatus, INVITE_CODE_LENGTH};
pub use job::Job;
pub use section::{Section, JOIN_CODE_LENGTH};
pub use submission::{Feedback, Submission, SubmissionKind, SubmissionStatus};

/// Trim a required text field, rejecting blanks and overlong values.
pub fn required_text(field: &str, value: &str, max_chars: usize) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    if value.chars().count() > max_chars {
        return Err(format!("{} must be at most {} characters", field, max_chars));
    }
    Ok(value.to_string())
}

/// Trim an optional text field, turning blanks into `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
