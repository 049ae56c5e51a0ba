//! Error types for the newsfeed services

use newsdesk_database::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NewsfeedError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0} is already subscribed")]
    AlreadySubscribed(String),

    #[error("{0} is not subscribed")]
    NotSubscribed(String),

    #[error("verification token has expired")]
    TokenExpired,

    #[error("a verification email was sent less than {cooldown_minutes} minutes ago")]
    Throttled { cooldown_minutes: i64 },

    #[error("issue {0} is not released")]
    IssueNotReleased(i64),

    #[error("could not generate a unique token after {0} attempts")]
    TokenGenerationExhausted(u32),

    #[error("mail delivery failed: {0}")]
    Mail(String),

    #[error(transparent)]
    Database(DatabaseError),
}

pub type NewsfeedResult<T> = Result<T, NewsfeedError>;

impl NewsfeedError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Lifts repository-level `NotFound` and `Duplicate` into their service
/// counterparts; everything else stays a database error.
impl From<DatabaseError> for NewsfeedError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => Self::NotFound(what),
            DatabaseError::Duplicate(msg) => Self::Duplicate(msg),
            other => Self::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_are_classified() {
        assert!(matches!(
            NewsfeedError::from(DatabaseError::NotFound("issue 4".into())),
            NewsfeedError::NotFound(what) if what == "issue 4"
        ));
        assert!(matches!(
            NewsfeedError::from(DatabaseError::Duplicate("issue number 1 already exists".into())),
            NewsfeedError::Duplicate(_)
        ));
        assert!(matches!(
            NewsfeedError::from(DatabaseError::QueryError("boom".into())),
            NewsfeedError::Database(_)
        ));
    }

    #[test]
    fn throttled_message_mentions_cooldown() {
        let err = NewsfeedError::Throttled { cooldown_minutes: 5 };
        assert!(err.to_string().contains("5 minutes"));
    }
}
