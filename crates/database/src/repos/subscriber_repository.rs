//! Repository for subscriber data access operations.

use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::entities::{CreateSubscriberRequest, Subscriber, SubscriberFilter};
use crate::types::{
    format_timestamp, parse_optional_timestamp, parse_timestamp, DatabaseError, DatabaseResult,
};

const SUBSCRIBER_COLUMNS: &str =
    "id, email_address, token, verified, subscribed, verification_sent_date, created_at, updated_at";

/// Repository for subscriber database operations
#[derive(Clone)]
pub struct SubscriberRepository {
    pool: SqlitePool,
}

impl SubscriberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateSubscriberRequest) -> DatabaseResult<Subscriber> {
        let now = format_timestamp(Utc::now());

        let result = sqlx::query(
            "INSERT INTO subscribers (email_address, token, verified, subscribed, created_at, updated_at)
             VALUES (?, ?, false, false, ?, ?)",
        )
        .bind(&request.email_address)
        .bind(&request.token)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::Duplicate(_) => DatabaseError::Duplicate(format!(
                "subscriber {} already exists",
                request.email_address
            )),
            other => other,
        })?;

        let subscriber_id = result.last_insert_rowid();
        info!(subscriber_id, "subscriber created");

        self.find_by_id(subscriber_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("subscriber {subscriber_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Subscriber>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_subscriber).transpose()
    }

    pub async fn find_by_email(&self, email_address: &str) -> DatabaseResult<Option<Subscriber>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE email_address = ?"
        ))
        .bind(email_address)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_subscriber).transpose()
    }

    /// Token lookup restricted to entries that are not currently subscribed.
    pub async fn find_pending_by_token(&self, token: &str) -> DatabaseResult<Option<Subscriber>> {
        let row = sqlx::query(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE token = ? AND subscribed = false"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_subscriber).transpose()
    }

    pub async fn token_exists(&self, token: &str) -> DatabaseResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM subscribers WHERE token = ?)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn update_token(&self, id: i64, token: &str) -> DatabaseResult<()> {
        let result = sqlx::query("UPDATE subscribers SET token = ?, updated_at = ? WHERE id = ?")
            .bind(token)
            .bind(format_timestamp(Utc::now()))
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("subscriber {id}")));
        }

        debug!(subscriber_id = id, "subscriber token rotated");
        Ok(())
    }

    pub async fn mark_verification_sent(
        &self,
        id: i64,
        sent_at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let sent_at = format_timestamp(sent_at);
        let result = sqlx::query(
            "UPDATE subscribers SET verification_sent_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&sent_at)
        .bind(&sent_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("subscriber {id}")));
        }
        Ok(())
    }

    pub async fn set_status(
        &self,
        id: i64,
        verified: bool,
        subscribed: bool,
    ) -> DatabaseResult<Subscriber> {
        let result = sqlx::query(
            "UPDATE subscribers SET verified = ?, subscribed = ?, updated_at = ? WHERE id = ?",
        )
        .bind(verified)
        .bind(subscribed)
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("subscriber {id}")));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("subscriber {id}")))
    }

    /// Admin listing, newest first.
    pub async fn list(&self, filter: &SubscriberFilter) -> DatabaseResult<Vec<Subscriber>> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers WHERE 1 = 1"
        ));

        if let Some(subscribed) = filter.subscribed {
            query.push(" AND subscribed = ").push_bind(subscribed);
        }
        if let Some(verified) = filter.verified {
            query.push(" AND verified = ").push_bind(verified);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query
                .push(" AND email_address LIKE ")
                .push_bind(format!("%{}%", search.to_lowercase()));
        }

        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_subscriber).collect()
    }

    /// One keyset page of active subscribers with `id > after_id`.
    pub async fn list_active_after(
        &self,
        after_id: i64,
        limit: i64,
    ) -> DatabaseResult<Vec<Subscriber>> {
        let rows = sqlx::query(&format!(
            "SELECT {SUBSCRIBER_COLUMNS} FROM subscribers
             WHERE verified = true AND subscribed = true AND id > ?
             ORDER BY id ASC LIMIT ?"
        ))
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_subscriber).collect()
    }
}

fn map_subscriber(row: &SqliteRow) -> DatabaseResult<Subscriber> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Subscriber {
        id: row.try_get("id")?,
        email_address: row.try_get("email_address")?,
        token: row.try_get("token")?,
        verified: row.try_get("verified")?,
        subscribed: row.try_get("subscribed")?,
        verification_sent_date: parse_optional_timestamp(row.try_get("verification_sent_date")?)?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}
