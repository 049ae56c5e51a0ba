//! Error types for the database layer

use thiserror::Error;

/// General database error
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),
}

/// Convert driver errors, lifting unique-constraint violations into `Duplicate`.
impl From<sqlx::Error> for DatabaseError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation()
                    || db_err.message().contains("UNIQUE constraint failed")
                {
                    DatabaseError::Duplicate(db_err.message().to_string())
                } else {
                    DatabaseError::QueryError(db_err.message().to_string())
                }
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DatabaseError::InvalidData(format!("column {index}: {source}"))
            }
            _ => DatabaseError::QueryError(err.to_string()),
        }
    }
}
