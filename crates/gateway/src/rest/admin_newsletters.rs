//! Newsletter scheduling and dispatch

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use newsdesk_database::CreateNewsletterRequest;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayResult;
use crate::rest::models::{
    BulkIdsRequest, DispatchReportResponse, ErrorResponse, NewsletterResponse,
};
use crate::state::GatewayState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListNewslettersQuery {
    pub is_sent: Option<bool>,
    pub issue_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateNewsletterBody {
    pub issue_id: i64,
    pub subject: String,
    /// Send time; unscheduled newsletters are only sent explicitly
    pub schedule: Option<DateTime<Utc>>,
}

pub fn create_admin_newsletter_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/newsletters", get(list_newsletters).post(create_newsletter))
        .route("/newsletters/send", post(send_newsletters))
        .route("/newsletters/send-due", post(send_due_newsletters))
        .route(
            "/newsletters/:id",
            get(get_newsletter).delete(delete_newsletter),
        )
}

#[utoipa::path(
    get,
    path = "/api/admin/newsletters",
    tag = "Admin",
    params(ListNewslettersQuery),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Newsletters", body = Vec<NewsletterResponse>)
    )
)]
pub async fn list_newsletters(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ListNewslettersQuery>,
) -> GatewayResult<Json<Vec<NewsletterResponse>>> {
    let newsletters = state
        .services
        .newsletters
        .list(query.is_sent, query.issue_id)
        .await?;
    Ok(Json(newsletters.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/newsletters",
    tag = "Admin",
    request_body = CreateNewsletterBody,
    security(("admin_token" = [])),
    responses(
        (status = 201, description = "Newsletter created", body = NewsletterResponse),
        (status = 400, description = "Invalid subject or unknown issue", body = ErrorResponse)
    )
)]
pub async fn create_newsletter(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<CreateNewsletterBody>,
) -> GatewayResult<(StatusCode, Json<NewsletterResponse>)> {
    let newsletter = state
        .services
        .newsletters
        .create(CreateNewsletterRequest {
            issue_id: body.issue_id,
            subject: body.subject,
            schedule: body.schedule,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(newsletter.into())))
}

#[utoipa::path(
    get,
    path = "/api/admin/newsletters/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Newsletter id")),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Newsletter", body = NewsletterResponse),
        (status = 404, description = "Newsletter not found", body = ErrorResponse)
    )
)]
pub async fn get_newsletter(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<Json<NewsletterResponse>> {
    let newsletter = state.services.newsletters.get(id).await?;
    Ok(Json(newsletter.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/newsletters/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Newsletter id")),
    security(("admin_token" = [])),
    responses(
        (status = 204, description = "Newsletter deleted"),
        (status = 404, description = "Newsletter not found", body = ErrorResponse)
    )
)]
pub async fn delete_newsletter(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<StatusCode> {
    state.services.newsletters.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/newsletters/send",
    tag = "Admin",
    request_body = BulkIdsRequest,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Per-newsletter dispatch report", body = DispatchReportResponse)
    )
)]
pub async fn send_newsletters(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<BulkIdsRequest>,
) -> GatewayResult<Json<DispatchReportResponse>> {
    let report = state.services.newsletters.send(&body.ids).await?;
    Ok(Json(report.into()))
}

#[utoipa::path(
    post,
    path = "/api/admin/newsletters/send-due",
    tag = "Admin",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Scheduled newsletters that were due", body = DispatchReportResponse)
    )
)]
pub async fn send_due_newsletters(
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<DispatchReportResponse>> {
    let report = state.services.newsletters.send_due(Utc::now()).await?;
    Ok(Json(report.into()))
}
