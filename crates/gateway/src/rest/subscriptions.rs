//! Double opt-in subscription endpoints

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::GatewayResult;
use crate::rest::models::ErrorResponse;
use crate::state::GatewayState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionStatusResponse {
    pub email_address: String,
    /// `verification_pending`, `subscribed` or `unsubscribed`
    pub state: String,
    pub message: String,
}

pub fn create_subscription_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/subscribe", post(subscribe))
        .route("/subscribe/confirm/:token", get(confirm))
        .route("/unsubscribe", post(unsubscribe))
}

#[utoipa::path(
    post,
    path = "/api/subscribe",
    tag = "Subscriptions",
    request_body = EmailRequest,
    responses(
        (status = 202, description = "Verification email sent", body = SubscriptionStatusResponse),
        (status = 400, description = "Invalid email address", body = ErrorResponse),
        (status = 409, description = "Already subscribed", body = ErrorResponse),
        (status = 429, description = "Verification email sent recently", body = ErrorResponse)
    )
)]
pub async fn subscribe(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<EmailRequest>,
) -> GatewayResult<(StatusCode, Json<SubscriptionStatusResponse>)> {
    let outcome = state
        .services
        .subscribers
        .request_subscription(&request.email)
        .await?;
    let subscriber = outcome.subscriber;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubscriptionStatusResponse {
            state: subscriber.state().as_str().to_string(),
            message: format!(
                "A confirmation link has been sent to {}",
                subscriber.email_address
            ),
            email_address: subscriber.email_address,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/subscribe/confirm/{token}",
    tag = "Subscriptions",
    params(("token" = String, Path, description = "Token from the verification email")),
    responses(
        (status = 200, description = "Subscription confirmed", body = SubscriptionStatusResponse),
        (status = 404, description = "Unknown or used token", body = ErrorResponse),
        (status = 410, description = "Token expired", body = ErrorResponse)
    )
)]
pub async fn confirm(
    State(state): State<Arc<GatewayState>>,
    Path(token): Path<String>,
) -> GatewayResult<Json<SubscriptionStatusResponse>> {
    let subscriber = state
        .services
        .subscribers
        .confirm_subscription(&token)
        .await?;

    Ok(Json(SubscriptionStatusResponse {
        state: subscriber.state().as_str().to_string(),
        message: "Your subscription is confirmed".to_string(),
        email_address: subscriber.email_address,
    }))
}

#[utoipa::path(
    post,
    path = "/api/unsubscribe",
    tag = "Subscriptions",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Unsubscribed", body = SubscriptionStatusResponse),
        (status = 400, description = "Invalid email address", body = ErrorResponse),
        (status = 409, description = "Address is not subscribed", body = ErrorResponse)
    )
)]
pub async fn unsubscribe(
    State(state): State<Arc<GatewayState>>,
    Json(request): Json<EmailRequest>,
) -> GatewayResult<Json<SubscriptionStatusResponse>> {
    let subscriber = state.services.subscribers.unsubscribe(&request.email).await?;

    Ok(Json(SubscriptionStatusResponse {
        state: subscriber.state().as_str().to_string(),
        message: "You have been unsubscribed".to_string(),
        email_address: subscriber.email_address,
    }))
}
