use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Resume,
    CoverLetter,
    Other,
}

impl SubmissionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SubmissionKind::Resume => "resume",
            SubmissionKind::CoverLetter => "cover letter",
            SubmissionKind::Other => "career document",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Waiting for AI feedback
    Pending,
    /// AI feedback stored
    Graded,
    /// A teacher has commented
    Reviewed,
}

/// Normalized grading result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    /// 0..=100
    pub score: u8,
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

/// A student document submitted for feedback
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: Uuid,
    pub student_id: Uuid,
    /// Posting the document targets, if any
    #[serde(default)]
    pub job_id: Option<Uuid>,
    pub kind: SubmissionKind,
    pub title: String,
    pub content: String,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    #[serde(default)]
    pub teacher_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
}

impl Document for Submission {
    const COLLECTION: &'static str = "submissions";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Submission {
    pub fn new(
        student_id: Uuid,
        job_id: Option<Uuid>,
        kind: SubmissionKind,
        title: String,
        content: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            job_id,
            kind,
            title,
            content,
            status: SubmissionStatus::Pending,
            feedback: None,
            teacher_comment: None,
            created_at: now,
            updated_at: now,
            graded_at: None,
        }
    }

    /// Store AI feedback. Fresh feedback replaces any reviewed score, so the
    /// submission goes back to `Graded`; the teacher comment is kept.
    pub fn apply_feedback(&mut self, feedback: Feedback) {
        let now = Utc::now();
        self.feedback = Some(feedback);
        self.status = SubmissionStatus::Graded;
        self.graded_at = Some(now);
        self.updated_at = now;
    }

    /// Record a teacher review, optionally overriding the score.
    ///
    /// A score only lands on existing feedback; ungraded submissions keep
    /// `feedback: None`.
    pub fn apply_review(&mut self, comment: Option<String>, score: Option<u8>) {
        if let (Some(score), Some(feedback)) = (score, self.feedback.as_mut()) {
            feedback.score = score.min(100);
        }
        if comment.is_some() {
            self.teacher_comment = comment;
        }
        self.status = SubmissionStatus::Reviewed;
        self.updated_at = Utc::now();
    }

    pub fn is_graded(&self) -> bool {
        self.feedback.is_some()
    }
}
