use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

pub const JOIN_CODE_LENGTH: usize = 6;

/// A class of students, optionally led by one teacher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    pub teacher_id: Option<Uuid>,
    /// Code students type to join
    pub join_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Section {
    const COLLECTION: &'static str = "sections";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Section {
    pub fn new(name: String, teacher_id: Option<Uuid>, join_code: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            teacher_id,
            join_code,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_taught_by(&self, user_id: Uuid) -> bool {
        self.teacher_id == Some(user_id)
    }
}
