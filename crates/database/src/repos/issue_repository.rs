//! Repository for issue data access operations.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::entities::{CreateIssueRequest, Issue, IssueFilter, IssueType, UpdateIssueRequest};
use crate::types::{format_timestamp, parse_timestamp, DatabaseError, DatabaseResult};

const ISSUE_COLUMNS: &str = "id, title, issue_number, publish_date, issue_type, short_description, is_draft, created_at, updated_at";

/// Released = out of draft with a publish date at or before the bound parameter.
const RELEASED_CLAUSE: &str = "is_draft = false AND publish_date <= ?";

const ISSUE_ORDERING: &str = "ORDER BY publish_date DESC, issue_number DESC";

/// Repository for issue database operations
#[derive(Clone)]
pub struct IssueRepository {
    pool: SqlitePool,
}

impl IssueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateIssueRequest) -> DatabaseResult<Issue> {
        let now = format_timestamp(Utc::now());

        let result = sqlx::query(
            "INSERT INTO issues (title, issue_number, publish_date, issue_type, short_description, is_draft, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.title)
        .bind(request.issue_number)
        .bind(format_timestamp(request.publish_date))
        .bind(request.issue_type.as_str())
        .bind(&request.short_description)
        .bind(request.is_draft)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Duplicate(_) => DatabaseError::Duplicate(format!(
                "issue number {} already exists",
                request.issue_number
            )),
            other => other,
        })?;

        let issue_id = result.last_insert_rowid();
        info!(issue_id, issue_number = request.issue_number, "issue created");

        self.find_by_id(issue_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("issue {issue_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Issue>> {
        let row = sqlx::query(&format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_issue).transpose()
    }

    /// Look up an issue by number, only if it is released as of `now`.
    pub async fn find_released_by_number(
        &self,
        issue_number: i64,
        now: DateTime<Utc>,
    ) -> DatabaseResult<Option<Issue>> {
        let row = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE issue_number = ? AND {RELEASED_CLAUSE}"
        ))
        .bind(issue_number)
        .bind(format_timestamp(now))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_issue).transpose()
    }

    pub async fn list_released(
        &self,
        now: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE {RELEASED_CLAUSE} {ISSUE_ORDERING} LIMIT ? OFFSET ?"
        ))
        .bind(format_timestamp(now))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_issue).collect()
    }

    pub async fn count_released(&self, now: DateTime<Utc>) -> DatabaseResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM issues WHERE {RELEASED_CLAUSE}"
        ))
        .bind(format_timestamp(now))
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Everything that is not released yet: drafts and future-dated issues.
    pub async fn list_unreleased(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<Issue>> {
        let rows = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE NOT ({RELEASED_CLAUSE}) {ISSUE_ORDERING}"
        ))
        .bind(format_timestamp(now))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_issue).collect()
    }

    pub async fn latest_released(&self, now: DateTime<Utc>) -> DatabaseResult<Option<Issue>> {
        let row = sqlx::query(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE {RELEASED_CLAUSE} {ISSUE_ORDERING} LIMIT 1"
        ))
        .bind(format_timestamp(now))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_issue).transpose()
    }

    pub async fn list(&self, filter: &IssueFilter) -> DatabaseResult<Vec<Issue>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ISSUE_COLUMNS} FROM issues WHERE 1 = 1"
        ));

        if let Some(is_draft) = filter.is_draft {
            query.push(" AND is_draft = ").push_bind(is_draft);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            query
                .push(" AND (title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR short_description LIKE ")
                .push_bind(pattern);
            if let Ok(number) = search.parse::<i64>() {
                query.push(" OR issue_number = ").push_bind(number);
            }
            query.push(")");
        }

        query.push(" ").push(ISSUE_ORDERING);

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_issue).collect()
    }

    pub async fn update(&self, id: i64, request: &UpdateIssueRequest) -> DatabaseResult<Issue> {
        let mut issue = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("issue {id}")))?;

        if let Some(title) = &request.title {
            issue.title = title.clone();
        }
        if let Some(issue_number) = request.issue_number {
            issue.issue_number = issue_number;
        }
        if let Some(publish_date) = request.publish_date {
            issue.publish_date = publish_date;
        }
        if let Some(issue_type) = request.issue_type {
            issue.issue_type = issue_type;
        }
        if let Some(description) = &request.short_description {
            issue.short_description = description.clone();
        }
        if let Some(is_draft) = request.is_draft {
            issue.is_draft = is_draft;
        }

        sqlx::query(
            "UPDATE issues SET title = ?, issue_number = ?, publish_date = ?, issue_type = ?,
                short_description = ?, is_draft = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&issue.title)
        .bind(issue.issue_number)
        .bind(format_timestamp(issue.publish_date))
        .bind(issue.issue_type.as_str())
        .bind(&issue.short_description)
        .bind(issue.is_draft)
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Duplicate(_) => DatabaseError::Duplicate(format!(
                "issue number {} already exists",
                issue.issue_number
            )),
            other => other,
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("issue {id}")))
    }

    /// Delete an issue. Its newsletters cascade and its posts are detached.
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM issues WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bulk toggle of the draft flag. Returns the number of rows touched.
    pub async fn set_draft(&self, ids: &[i64], is_draft: bool) -> DatabaseResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE issues SET is_draft = ");
        query
            .push_bind(is_draft)
            .push(", updated_at = ")
            .push_bind(format_timestamp(Utc::now()))
            .push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn map_issue(row: &SqliteRow) -> DatabaseResult<Issue> {
    let issue_type: String = row.try_get("issue_type")?;
    let publish_date: String = row.try_get("publish_date")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Issue {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        issue_number: row.try_get("issue_number")?,
        publish_date: parse_timestamp(&publish_date)?,
        issue_type: IssueType::from(issue_type.as_str()),
        short_description: row.try_get("short_description")?,
        is_draft: row.try_get("is_draft")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
