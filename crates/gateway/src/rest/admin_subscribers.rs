//! Subscriber listing

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use newsdesk_database::SubscriberFilter;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::GatewayResult;
use crate::rest::models::{ErrorResponse, SubscriberResponse};
use crate::state::GatewayState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListSubscribersQuery {
    pub subscribed: Option<bool>,
    pub verified: Option<bool>,
    /// Email substring
    pub search: Option<String>,
}

pub fn create_admin_subscriber_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/subscribers", get(list_subscribers))
        .route("/subscribers/active", get(list_active_subscribers))
}

#[utoipa::path(
    get,
    path = "/api/admin/subscribers",
    tag = "Admin",
    params(ListSubscribersQuery),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Subscribers with their verification state", body = Vec<SubscriberResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_subscribers(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ListSubscribersQuery>,
) -> GatewayResult<Json<Vec<SubscriberResponse>>> {
    let filter = SubscriberFilter {
        subscribed: query.subscribed,
        verified: query.verified,
        search: query.search,
    };
    let subscribers = state.services.subscribers.list(&filter).await?;
    Ok(Json(subscribers.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/admin/subscribers/active",
    tag = "Admin",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Verified and subscribed addresses", body = Vec<SubscriberResponse>)
    )
)]
pub async fn list_active_subscribers(
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<Vec<SubscriberResponse>>> {
    let subscribers = state.services.subscribers.active_subscribers().await?;
    Ok(Json(subscribers.into_iter().map(Into::into).collect()))
}
