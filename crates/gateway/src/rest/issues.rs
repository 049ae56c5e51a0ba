//! Public issue endpoints. Only released issues are visible here.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::GatewayResult;
use crate::rest::models::{ErrorResponse, IssueDetailResponse, IssuePageResponse};
use crate::state::GatewayState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct IssuePageQuery {
    /// 1-based page number
    pub page: Option<u32>,
}

pub fn create_issue_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/issues", get(list_issues))
        .route("/issues/latest", get(latest_issue))
        .route("/issues/:issue_number", get(get_issue))
}

#[utoipa::path(
    get,
    path = "/api/issues",
    tag = "Issues",
    params(IssuePageQuery),
    responses(
        (status = 200, description = "Released issues, newest first", body = IssuePageResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub async fn list_issues(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<IssuePageQuery>,
) -> GatewayResult<Json<IssuePageResponse>> {
    let page = state
        .services
        .issues
        .list_released(query.page.unwrap_or(1))
        .await?;
    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/issues/latest",
    tag = "Issues",
    responses(
        (status = 200, description = "Most recent released issue", body = IssueDetailResponse),
        (status = 404, description = "Nothing released yet", body = ErrorResponse)
    )
)]
pub async fn latest_issue(
    State(state): State<Arc<GatewayState>>,
) -> GatewayResult<Json<IssueDetailResponse>> {
    let detail = state.services.issues.latest_released().await?;
    Ok(Json(detail.into()))
}

#[utoipa::path(
    get,
    path = "/api/issues/{issue_number}",
    tag = "Issues",
    params(("issue_number" = i64, Path, description = "Issue number")),
    responses(
        (status = 200, description = "Issue with its visible posts", body = IssueDetailResponse),
        (status = 404, description = "Issue not found or not released", body = ErrorResponse)
    )
)]
pub async fn get_issue(
    State(state): State<Arc<GatewayState>>,
    Path(issue_number): Path<i64>,
) -> GatewayResult<Json<IssueDetailResponse>> {
    let detail = state.services.issues.released_detail(issue_number).await?;
    Ok(Json(detail.into()))
}
