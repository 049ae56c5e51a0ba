//! Issue entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A dated digest that groups posts and is released on a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: i64,
    pub title: String,
    pub issue_number: i64,
    pub publish_date: DateTime<Utc>,
    pub issue_type: IssueType,
    pub short_description: Option<String>,
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// An issue is released once it is out of draft and its publish date has passed.
    pub fn is_published(&self, now: DateTime<Utc>) -> bool {
        !self.is_draft && self.publish_date <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    pub title: String,
    pub issue_number: i64,
    pub publish_date: DateTime<Utc>,
    #[serde(default)]
    pub issue_type: IssueType,
    pub short_description: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    pub title: Option<String>,
    pub issue_number: Option<i64>,
    pub publish_date: Option<DateTime<Utc>>,
    pub issue_type: Option<IssueType>,
    /// `Some(None)` clears the description.
    #[serde(default, with = "super::double_option")]
    pub short_description: Option<Option<String>>,
    pub is_draft: Option<bool>,
}

/// Release cadence of an issue. Stored as the numeric codes `1`, `2`, `4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Daily => "1",
            IssueType::Weekly => "2",
            IssueType::Monthly => "4",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueType::Daily => "Daily Issue",
            IssueType::Weekly => "Weekly Issue",
            IssueType::Monthly => "Monthly Issue",
        }
    }
}

impl From<&str> for IssueType {
    fn from(s: &str) -> Self {
        match s {
            "1" => IssueType::Daily,
            "4" => IssueType::Monthly,
            _ => IssueType::Weekly,
        }
    }
}

impl ToString for IssueType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// Admin-side listing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFilter {
    pub is_draft: Option<bool>,
    /// Matches title or description, or the issue number exactly.
    pub search: Option<String>,
}
