//! Newsdesk Database Crate
//!
//! SQLite connection management, embedded migrations, entities and the
//! repositories the newsfeed services are built on.

use newsdesk_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::{run_migrations, MIGRATOR};

pub use repos::{
    CategoryRepository, IssueRepository, NewsletterRepository, PostRepository,
    SubscriberRepository,
};

pub use entities::{
    CategorizedPost, CreateCategoryRequest, CreateIssueRequest, CreateNewsletterRequest,
    CreatePostRequest, CreateSubscriberRequest, Issue, IssueFilter, IssueType, Newsletter, Post,
    PostCategory, PostFilter, Subscriber, SubscriberFilter, SubscriberState,
    UpdateCategoryRequest, UpdateIssueRequest, UpdatePostRequest,
};

pub use types::{errors::DatabaseError, format_timestamp, parse_timestamp, DatabaseResult};

pub use sqlx::SqlitePool as Pool;

/// Connect and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn initialize_database_runs_migrations() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", temp_dir.path().join("init.db").display()),
            max_connections: 1,
        };

        let pool = initialize_database(&config).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM issues")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn initialize_database_reports_unreachable_path() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", blocker.join("news.db").display()),
            max_connections: 1,
        };

        let err = initialize_database(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConnectionError(_)));
    }
}
