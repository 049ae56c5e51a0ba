//! Repository for newsletter data access operations.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::entities::{CreateNewsletterRequest, Newsletter};
use crate::types::{
    format_timestamp, parse_optional_timestamp, parse_timestamp, DatabaseError, DatabaseResult,
};

const NEWSLETTER_COLUMNS: &str =
    "id, issue_id, subject, schedule, is_sent, sent_at, created_at, updated_at";

/// Repository for newsletter database operations
#[derive(Clone)]
pub struct NewsletterRepository {
    pool: SqlitePool,
}

impl NewsletterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateNewsletterRequest) -> DatabaseResult<Newsletter> {
        let now = format_timestamp(Utc::now());

        let result = sqlx::query(
            "INSERT INTO newsletters (issue_id, subject, schedule, is_sent, created_at, updated_at)
             VALUES (?, ?, ?, false, ?, ?)",
        )
        .bind(request.issue_id)
        .bind(&request.subject)
        .bind(request.schedule.map(format_timestamp))
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let newsletter_id = result.last_insert_rowid();
        info!(newsletter_id, issue_id = request.issue_id, "newsletter created");

        self.find_by_id(newsletter_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("newsletter {newsletter_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Newsletter>> {
        let row = sqlx::query(&format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_newsletter).transpose()
    }

    /// List newsletters, latest schedule first, optionally by sent state or issue.
    pub async fn list(
        &self,
        is_sent: Option<bool>,
        issue_id: Option<i64>,
    ) -> DatabaseResult<Vec<Newsletter>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters WHERE 1 = 1"
        ));
        if let Some(is_sent) = is_sent {
            query.push(" AND is_sent = ").push_bind(is_sent);
        }
        if let Some(issue_id) = issue_id {
            query.push(" AND issue_id = ").push_bind(issue_id);
        }
        query.push(" ORDER BY schedule IS NULL, schedule DESC, id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_newsletter).collect()
    }

    /// Unsent newsletters whose schedule has passed, oldest first.
    pub async fn list_due(&self, now: DateTime<Utc>) -> DatabaseResult<Vec<Newsletter>> {
        let rows = sqlx::query(&format!(
            "SELECT {NEWSLETTER_COLUMNS} FROM newsletters
             WHERE is_sent = false AND schedule IS NOT NULL AND schedule <= ?
             ORDER BY schedule ASC, id ASC"
        ))
        .bind(format_timestamp(now))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_newsletter).collect()
    }

    /// Flag a newsletter as sent. Returns false if it was already sent.
    pub async fn mark_sent(&self, id: i64, sent_at: DateTime<Utc>) -> DatabaseResult<bool> {
        let sent_at = format_timestamp(sent_at);
        let result = sqlx::query(
            "UPDATE newsletters SET is_sent = true, sent_at = ?, updated_at = ?
             WHERE id = ? AND is_sent = false",
        )
        .bind(&sent_at)
        .bind(&sent_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM newsletters WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_newsletter(row: &SqliteRow) -> DatabaseResult<Newsletter> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Newsletter {
        id: row.try_get("id")?,
        issue_id: row.try_get("issue_id")?,
        subject: row.try_get("subject")?,
        schedule: parse_optional_timestamp(row.try_get("schedule")?)?,
        is_sent: row.try_get("is_sent")?,
        sent_at: parse_optional_timestamp(row.try_get("sent_at")?)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
