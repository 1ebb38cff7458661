use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Document;

pub const INVITE_CODE_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Used,
    Expired,
}

/// Single-use code letting one email address register as a teacher
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invite {
    pub id: Uuid,
    pub code: String,
    pub email: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub used_by: Option<Uuid>,
}

impl Document for Invite {
    const COLLECTION: &'static str = "invites";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Invite {
    pub fn new(code: String, email: String, created_by: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            code,
            email,
            created_by,
            created_at: now,
            expires_at: now + ttl,
            used_at: None,
            used_by: None,
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> InviteStatus {
        if self.used_at.is_some() {
            InviteStatus::Used
        } else if self.expires_at <= now {
            InviteStatus::Expired
        } else {
            InviteStatus::Pending
        }
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == InviteStatus::Pending
    }

    pub fn redeem(&mut self, user_id: Uuid) {
        self.used_at = Some(Utc::now());
        self.used_by = Some(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_lifecycle() {
        let mut invite = Invite::new(
            "ABCDEFGH".into(),
            "t@school.edu".into(),
            Uuid::new_v4(),
            Duration::days(7),
        );
        let now = Utc::now();
        assert_eq!(invite.status(now), InviteStatus::Pending);
        assert_eq!(invite.status(now + Duration::days(8)), InviteStatus::Expired);

        invite.redeem(Uuid::new_v4());
        assert_eq!(invite.status(now), InviteStatus::Used);
        assert!(!invite.is_redeemable(now));
    }
}
