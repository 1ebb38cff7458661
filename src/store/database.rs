//! # Database
//!
//! The six collections of the application plus the few operations that
//! touch more than one of them. Cross-collection operations are not atomic:
//! each step persists on its own.

use std::fs;
use std::path::Path;

use tracing::info;
use uuid::Uuid;

use super::collection::Collection;
use super::errors::{StoreError, StoreResult};
use crate::auth::user::{Role, User};
use crate::model::{Checklist, Invite, Job, Section, Submission};

pub struct Database {
    pub users: Collection<User>,
    pub sections: Collection<Section>,
    pub jobs: Collection<Job>,
    pub submissions: Collection<Submission>,
    pub checklists: Collection<Checklist>,
    pub invites: Collection<Invite>,
}

impl Database {
    pub fn in_memory() -> Self {
        Self {
            users: Collection::in_memory(),
            sections: Collection::in_memory(),
            jobs: Collection::in_memory(),
            submissions: Collection::in_memory(),
            checklists: Collection::in_memory(),
            invites: Collection::in_memory(),
        }
    }

    /// Open every collection under `data_dir`, creating the directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(data_dir).map_err(|source| StoreError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let dir = Some(data_dir);
        let db = Self {
            users: Collection::open(dir)?,
            sections: Collection::open(dir)?,
            jobs: Collection::open(dir)?,
            submissions: Collection::open(dir)?,
            checklists: Collection::open(dir)?,
            invites: Collection::open(dir)?,
        };

        info!(
            data_dir = %data_dir.display(),
            users = db.users.count(|_| true)?,
            sections = db.sections.count(|_| true)?,
            "database opened"
        );

        Ok(db)
    }

    pub fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users.find_one(|u| u.email == email)
    }

    /// Students whose `section_id` points at this section
    pub fn section_students(&self, section_id: Uuid) -> StoreResult<Vec<User>> {
        self.users
            .find(|u| u.role == Role::Student && u.section_id == Some(section_id))
    }

    /// Ids of the sections a teacher leads
    pub fn teacher_section_ids(&self, teacher_id: Uuid) -> StoreResult<Vec<Uuid>> {
        Ok(self
            .sections
            .find(|s| s.is_taught_by(teacher_id))?
            .into_iter()
            .map(|s| s.id)
            .collect())
    }

    /// Ids of the students in any section the teacher leads
    pub fn teacher_student_ids(&self, teacher_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let sections = self.teacher_section_ids(teacher_id)?;
        Ok(self
            .users
            .find(|u| u.section_id.map_or(false, |s| sections.contains(&s)))?
            .into_iter()
            .map(|u| u.id)
            .collect())
    }

    /// Whether `student_id` sits in a section led by `teacher_id`
    pub fn teaches_student(&self, teacher_id: Uuid, student_id: Uuid) -> StoreResult<bool> {
        let Some(student) = self.users.get(student_id)? else {
            return Ok(false);
        };
        match student.section_id {
            Some(section_id) => Ok(self
                .sections
                .get(section_id)?
                .map_or(false, |s| s.is_taught_by(teacher_id))),
            None => Ok(false),
        }
    }

    /// Delete a user and everything that only exists for them.
    ///
    /// Submissions and the checklist are removed, sections they taught lose
    /// their teacher, jobs they posted and invites they issued stay.
    pub fn delete_user(&self, user_id: Uuid) -> StoreResult<User> {
        let user = self.users.require(user_id)?;

        let submissions = self.submissions.delete_where(|s| s.student_id == user_id)?;
        self.checklists.delete_where(|c| c.student_id == user_id)?;
        let sections = self.sections.update_where(
            |s| s.is_taught_by(user_id),
            |s| {
                s.teacher_id = None;
                s.updated_at = chrono::Utc::now();
            },
        )?;

        let removed = self.users.delete(user_id)?;
        info!(
            user_id = %user_id,
            role = %user.role,
            submissions,
            sections,
            "user deleted"
        );

        Ok(removed)
    }

    /// Delete a section, detaching its students and removing jobs scoped to it.
    /// Submissions against those jobs are kept with `job_id` cleared.
    pub fn delete_section(&self, section_id: Uuid) -> StoreResult<Section> {
        self.sections.require(section_id)?;

        let students = self.users.update_where(
            |u| u.section_id == Some(section_id),
            |u| {
                u.section_id = None;
                u.updated_at = chrono::Utc::now();
            },
        )?;

        let job_ids: Vec<Uuid> = self
            .jobs
            .find(|j| j.section_id == Some(section_id))?
            .into_iter()
            .map(|j| j.id)
            .collect();
        // Submissions outlive the postings they targeted
        let detached = self.submissions.update_where(
            |s| s.job_id.map_or(false, |j| job_ids.contains(&j)),
            |s| s.job_id = None,
        )?;
        let jobs = self.jobs.delete_where(|j| job_ids.contains(&j.id))?;

        let removed = self.sections.delete(section_id)?;
        info!(section_id = %section_id, students, jobs, detached, "section deleted");

        Ok(removed)
    }
}
