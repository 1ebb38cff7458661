//! # Statistics
//!
//! Aggregations behind the teacher and admin dashboards.

use std::collections::HashMap;

use serde::Serialize;

use crate::auth::user::Role;
use crate::model::{InviteStatus, Submission, SubmissionStatus};
use crate::store::{Database, StoreResult};

pub const DEFAULT_WEAKNESS_LIMIT: usize = 10;
pub const MAX_WEAKNESS_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeaknessCount {
    pub weakness: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeaknessReport {
    /// Submissions with feedback
    pub graded: usize,
    /// Mean score to one decimal; `None` when nothing is graded
    pub average_score: Option<f64>,
    pub top: Vec<WeaknessCount>,
}

/// Most common weaknesses across graded submissions.
///
/// Weaknesses are compared case-insensitively after trimming and count once
/// per submission. The first spelling seen is the one reported. Ties are
/// broken alphabetically.
pub fn weakness_stats<'a, I>(submissions: I, limit: usize) -> WeaknessReport
where
    I: IntoIterator<Item = &'a Submission>,
{
    let limit = limit.clamp(1, MAX_WEAKNESS_LIMIT);

    // canonical -> (display, count)
    let mut counts: HashMap<String, (String, usize)> = HashMap::new();
    let mut graded = 0usize;
    let mut score_total = 0u64;

    for feedback in submissions.into_iter().filter_map(|s| s.feedback.as_ref()) {
        graded += 1;
        score_total += u64::from(feedback.score);

        let mut seen_here: Vec<String> = Vec::new();
        for weakness in &feedback.weaknesses {
            let display = weakness.trim();
            if display.is_empty() {
                continue;
            }
            let canonical = display.to_lowercase();
            if seen_here.contains(&canonical) {
                continue;
            }

            counts
                .entry(canonical.clone())
                .or_insert_with(|| (display.to_string(), 0))
                .1 += 1;
            seen_here.push(canonical);
        }
    }

    let mut top: Vec<WeaknessCount> = counts
        .into_values()
        .map(|(weakness, count)| WeaknessCount { weakness, count })
        .collect();
    top.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.weakness.to_lowercase().cmp(&b.weakness.to_lowercase()))
    });
    top.truncate(limit);

    let average_score = if graded == 0 {
        None
    } else {
        let mean = score_total as f64 / graded as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    WeaknessReport {
        graded,
        average_score,
        top,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct RoleCounts {
    pub admin: usize,
    pub teacher: usize,
    pub student: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct StatusCounts {
    pub pending: usize,
    pub graded: usize,
    pub reviewed: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Overview {
    pub users: RoleCounts,
    pub sections: usize,
    pub jobs: usize,
    pub submissions: StatusCounts,
    pub pending_invites: usize,
}

/// Whole-system counts for the admin dashboard
pub fn overview(db: &Database) -> StoreResult<Overview> {
    let mut users = RoleCounts::default();
    for user in db.users.list()? {
        match user.role {
            Role::Admin => users.admin += 1,
            Role::Teacher => users.teacher += 1,
            Role::Student => users.student += 1,
        }
    }

    let mut submissions = StatusCounts::default();
    for submission in db.submissions.list()? {
        match submission.status {
            SubmissionStatus::Pending => submissions.pending += 1,
            SubmissionStatus::Graded => submissions.graded += 1,
            SubmissionStatus::Reviewed => submissions.reviewed += 1,
        }
    }

    let now = chrono::Utc::now();
    Ok(Overview {
        users,
        sections: db.sections.count(|_| true)?,
        jobs: db.jobs.count(|_| true)?,
        submissions,
        pending_invites: db
            .invites
            .count(|i| i.status(now) == InviteStatus::Pending)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Feedback, SubmissionKind};
    use uuid::Uuid;

    fn graded(score: u8, weaknesses: &[&str]) -> Submission {
        let mut s = Submission::new(
            Uuid::new_v4(),
            None,
            SubmissionKind::Resume,
            "r".into(),
            "c".into(),
        );
        s.apply_feedback(Feedback {
            score,
            weaknesses: weaknesses.iter().map(|w| w.to_string()).collect(),
            ..Feedback::default()
        });
        s
    }

    fn pending() -> Submission {
        Submission::new(
            Uuid::new_v4(),
            None,
            SubmissionKind::CoverLetter,
            "c".into(),
            "c".into(),
        )
    }

    #[test]
    fn test_counts_case_insensitively_first_spelling_wins() {
        let subs = vec![
            graded(70, &["No metrics", "Typos"]),
            graded(80, &["no metrics ", "Too long"]),
            graded(90, &["NO METRICS"]),
            pending(),
        ];

        let report = weakness_stats(&subs, 10);
        assert_eq!(report.graded, 3);
        assert_eq!(report.average_score, Some(80.0));
        assert_eq!(
            report.top[0],
            WeaknessCount {
                weakness: "No metrics".into(),
                count: 3
            }
        );
        // Ties sorted alphabetically
        assert_eq!(report.top[1].weakness, "Too long");
        assert_eq!(report.top[2].weakness, "Typos");
    }

    #[test]
    fn test_duplicate_within_one_submission_counts_once() {
        let subs = vec![graded(50, &["Vague", "vague", "  "])];
        let report = weakness_stats(&subs, 10);
        assert_eq!(report.top.len(), 1);
        assert_eq!(report.top[0].count, 1);
    }

    #[test]
    fn test_limit_and_empty_input() {
        let subs = vec![graded(60, &["a", "b", "c", "d"])];
        assert_eq!(weakness_stats(&subs, 2).top.len(), 2);
        // Zero is raised to one
        assert_eq!(weakness_stats(&subs, 0).top.len(), 1);

        let empty = weakness_stats(&Vec::<Submission>::new(), 10);
        assert_eq!(empty.graded, 0);
        assert_eq!(empty.average_score, None);
        assert!(empty.top.is_empty());
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let subs = vec![graded(70, &[]), graded(71, &[]), graded(71, &[])];
        assert_eq!(weakness_stats(&subs, 10).average_score, Some(70.7));
    }

    #[test]
    fn test_overview_counts() {
        use crate::auth::crypto::PasswordPolicy;
        use crate::auth::user::User;

        let db = Database::in_memory();
        for (email, role) in [
            ("a@x.io", Role::Admin),
            ("t@x.io", Role::Teacher),
            ("s1@x.io", Role::Student),
            ("s2@x.io", Role::Student),
        ] {
            db.users
                .insert(User::new("N", email, role, "password123", &PasswordPolicy::default()).unwrap())
                .unwrap();
        }
        db.submissions.insert(pending()).unwrap();
        db.submissions.insert(graded(10, &[])).unwrap();

        let o = overview(&db).unwrap();
        assert_eq!(o.users, RoleCounts { admin: 1, teacher: 1, student: 2 });
        assert_eq!(o.submissions.pending, 1);
        assert_eq!(o.submissions.graded, 1);
        assert_eq!(o.sections, 0);
        assert_eq!(o.pending_invites, 0);
    }
}
