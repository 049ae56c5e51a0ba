//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use newsdesk_newsfeed::NewsfeedError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::Gone(_) => StatusCode::GONE,
            GatewayError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InternalError(_) | GatewayError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            GatewayError::InternalError(_) | GatewayError::DatabaseError(_) => {
                error!(error = %self, "request failed");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        let error_response = json!({
            "error": status.as_str(),
            "message": message,
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<NewsfeedError> for GatewayError {
    fn from(err: NewsfeedError) -> Self {
        match err {
            NewsfeedError::NotFound(what) => GatewayError::NotFound(format!("{what} not found")),
            NewsfeedError::Validation(msg) => GatewayError::InvalidRequest(msg),
            NewsfeedError::Duplicate(_)
            | NewsfeedError::AlreadySubscribed(_)
            | NewsfeedError::NotSubscribed(_)
            | NewsfeedError::IssueNotReleased(_) => GatewayError::Conflict(err.to_string()),
            NewsfeedError::TokenExpired => GatewayError::Gone(err.to_string()),
            NewsfeedError::Throttled { .. } => GatewayError::RateLimitExceeded(err.to_string()),
            NewsfeedError::TokenGenerationExhausted(_) | NewsfeedError::Mail(_) => {
                GatewayError::InternalError(err.to_string())
            }
            NewsfeedError::Database(db_err) => GatewayError::DatabaseError(db_err.to_string()),
        }
    }
}
