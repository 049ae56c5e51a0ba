//! Post and post category entity definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A curated link, optionally attached to an issue and a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub issue_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: String,
    pub source_url: String,
    pub short_description: String,
    pub is_visible: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostCategory {
    pub id: i64,
    pub name: String,
    pub order: i64,
}

/// A visible post as it appears inside an issue, with its category resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedPost {
    pub post: Post,
    pub category: Option<PostCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub issue_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: String,
    pub source_url: String,
    pub short_description: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub order: i64,
}

/// Partial post update. `issue_id`/`category_id` use a nested option so a
/// caller can detach a post (`Some(None)`) as well as leave it untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostRequest {
    #[serde(default, with = "super::double_option")]
    pub issue_id: Option<Option<i64>>,
    #[serde(default, with = "super::double_option")]
    pub category_id: Option<Option<i64>>,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub short_description: Option<String>,
    pub is_visible: Option<bool>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostFilter {
    pub issue_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_visible: Option<bool>,
    /// Matches title, source url or description.
    pub search: Option<String>,
}
