use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

/// Items every new checklist starts with
pub const DEFAULT_ITEMS: &[&str] = &[
    "Upload your resume for feedback",
    "Write a cover letter",
    "Complete your LinkedIn profile",
    "Apply to three jobs",
    "Schedule a mock interview",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub label: String,
    pub done: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ChecklistItem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            label: label.into(),
            done: false,
            completed_at: None,
        }
    }

    pub fn set_done(&mut self, done: bool) {
        if done && !self.done {
            self.completed_at = Some(Utc::now());
        } else if !done {
            self.completed_at = None;
        }
        self.done = done;
    }
}

/// A student's job-search checklist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checklist {
    pub id: Uuid,
    pub student_id: Uuid,
    pub items: Vec<ChecklistItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Checklist {
    const COLLECTION: &'static str = "checklists";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Checklist {
    pub fn with_defaults(student_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            student_id,
            items: DEFAULT_ITEMS.iter().map(|l| ChecklistItem::new(*l)).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Completed share in whole percent, rounded down
    pub fn progress(&self) -> u8 {
        if self.items.is_empty() {
            return 0;
        }
        let done = self.items.iter().filter(|i| i.done).count();
        (done * 100 / self.items.len()) as u8
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut ChecklistItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
