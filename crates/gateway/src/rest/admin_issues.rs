//! Issue administration

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use newsdesk_database::{CreateIssueRequest, IssueFilter, IssueType, UpdateIssueRequest};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{GatewayError, GatewayResult};
use crate::rest::models::{
    nullable, BulkIdsRequest, BulkUpdateResponse, ErrorResponse, IssueDetailResponse,
    IssueResponse,
};
use crate::state::GatewayState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListIssuesQuery {
    /// Title/description substring or exact issue number
    pub search: Option<String>,
    pub is_draft: Option<bool>,
    /// Only drafts and issues scheduled in the future
    pub unreleased: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateIssueBody {
    pub title: String,
    pub issue_number: i64,
    pub publish_date: DateTime<Utc>,
    /// `daily`, `weekly` (default) or `monthly`
    pub issue_type: Option<String>,
    pub short_description: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateIssueBody {
    pub title: Option<String>,
    pub issue_number: Option<i64>,
    pub publish_date: Option<DateTime<Utc>>,
    pub issue_type: Option<String>,
    /// `null` clears the description
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub short_description: Option<Option<String>>,
    pub is_draft: Option<bool>,
}

pub(crate) fn parse_issue_type(value: &str) -> GatewayResult<IssueType> {
    match value.trim().to_ascii_lowercase().as_str() {
        "daily" | "1" => Ok(IssueType::Daily),
        "weekly" | "2" => Ok(IssueType::Weekly),
        "monthly" | "4" => Ok(IssueType::Monthly),
        other => Err(GatewayError::InvalidRequest(format!(
            "unknown issue type '{other}'"
        ))),
    }
}

pub fn create_admin_issue_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/issues", get(list_issues).post(create_issue))
        .route("/issues/publish", post(publish_issues))
        .route("/issues/draft", post(draft_issues))
        .route(
            "/issues/:id",
            get(get_issue).put(update_issue).delete(delete_issue),
        )
}

#[utoipa::path(
    get,
    path = "/api/admin/issues",
    tag = "Admin",
    params(ListIssuesQuery),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Matching issues", body = Vec<IssueResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn list_issues(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ListIssuesQuery>,
) -> GatewayResult<Json<Vec<IssueResponse>>> {
    let issues = match (query.unreleased.unwrap_or(false), query.is_draft, query.search) {
        (true, _, _) => state.services.issues.list_drafts().await?,
        (false, None, Some(search)) => state.services.issues.search(&search).await?,
        (false, is_draft, search) => {
            state
                .services
                .issues
                .list(&IssueFilter { is_draft, search })
                .await?
        }
    };
    Ok(Json(issues.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/issues",
    tag = "Admin",
    request_body = CreateIssueBody,
    security(("admin_token" = [])),
    responses(
        (status = 201, description = "Issue created", body = IssueResponse),
        (status = 400, description = "Invalid issue", body = ErrorResponse),
        (status = 409, description = "Issue number taken", body = ErrorResponse)
    )
)]
pub async fn create_issue(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<CreateIssueBody>,
) -> GatewayResult<(StatusCode, Json<IssueResponse>)> {
    let issue_type = body
        .issue_type
        .as_deref()
        .map(parse_issue_type)
        .transpose()?
        .unwrap_or_default();

    let issue = state
        .services
        .issues
        .create(CreateIssueRequest {
            title: body.title,
            issue_number: body.issue_number,
            publish_date: body.publish_date,
            issue_type,
            short_description: body.short_description,
            is_draft: body.is_draft,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(issue.into())))
}

#[utoipa::path(
    get,
    path = "/api/admin/issues/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Issue id")),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Issue with its visible posts", body = IssueDetailResponse),
        (status = 404, description = "Issue not found", body = ErrorResponse)
    )
)]
pub async fn get_issue(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<Json<IssueDetailResponse>> {
    let issues = &state.services.issues;
    let detail = issues.detail(issues.get(id).await?).await?;
    Ok(Json(detail.into()))
}

#[utoipa::path(
    put,
    path = "/api/admin/issues/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Issue id")),
    request_body = UpdateIssueBody,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Issue updated", body = IssueResponse),
        (status = 404, description = "Issue not found", body = ErrorResponse),
        (status = 409, description = "Issue number taken", body = ErrorResponse)
    )
)]
pub async fn update_issue(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateIssueBody>,
) -> GatewayResult<Json<IssueResponse>> {
    let issue_type = body
        .issue_type
        .as_deref()
        .map(parse_issue_type)
        .transpose()?;

    let issue = state
        .services
        .issues
        .update(
            id,
            UpdateIssueRequest {
                title: body.title,
                issue_number: body.issue_number,
                publish_date: body.publish_date,
                issue_type,
                short_description: body.short_description,
                is_draft: body.is_draft,
            },
        )
        .await?;
    Ok(Json(issue.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/issues/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Issue id")),
    security(("admin_token" = [])),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 404, description = "Issue not found", body = ErrorResponse)
    )
)]
pub async fn delete_issue(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<StatusCode> {
    state.services.issues.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/issues/publish",
    tag = "Admin",
    request_body = BulkIdsRequest,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Issues taken out of draft", body = BulkUpdateResponse)
    )
)]
pub async fn publish_issues(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<BulkIdsRequest>,
) -> GatewayResult<Json<BulkUpdateResponse>> {
    let updated = state.services.issues.publish(&body.ids).await?;
    Ok(Json(BulkUpdateResponse {
        requested: body.ids.len(),
        updated,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/issues/draft",
    tag = "Admin",
    request_body = BulkIdsRequest,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Issues moved back to draft", body = BulkUpdateResponse)
    )
)]
pub async fn draft_issues(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<BulkIdsRequest>,
) -> GatewayResult<Json<BulkUpdateResponse>> {
    let updated = state.services.issues.mark_draft(&body.ids).await?;
    Ok(Json(BulkUpdateResponse {
        requested: body.ids.len(),
        updated,
    }))
}
