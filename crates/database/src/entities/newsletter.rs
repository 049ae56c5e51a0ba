//! Newsletter entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A planned or completed email dispatch of an issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Newsletter {
    pub id: i64,
    pub issue_id: i64,
    pub subject: String,
    pub schedule: Option<DateTime<Utc>>,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Newsletter {
    /// Unsent and scheduled at or before `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.is_sent && self.schedule.is_some_and(|schedule| schedule <= now)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNewsletterRequest {
    pub issue_id: i64,
    pub subject: String,
    pub schedule: Option<DateTime<Utc>>,
}
