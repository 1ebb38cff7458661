use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

/// A job or internship posting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
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
    /// Restricts visibility to one section; `None` is visible to everyone
    #[serde(default)]
    pub section_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Job {
    const COLLECTION: &'static str = "jobs";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Job {
    pub fn is_visible_in(&self, section_id: Option<Uuid>) -> bool {
        self.section_id.is_none() || self.section_id == section_id
    }

    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map_or(true, |d| d >= now)
    }
}
