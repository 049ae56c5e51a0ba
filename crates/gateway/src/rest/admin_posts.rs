//! Post and category administration

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use newsdesk_database::{
    CreateCategoryRequest, CreatePostRequest, PostFilter, UpdateCategoryRequest,
    UpdatePostRequest,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::GatewayResult;
use crate::rest::models::{
    nullable, BulkIdsRequest, BulkUpdateResponse, CategoryResponse, ErrorResponse, PostResponse,
};
use crate::state::GatewayState;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListCategoriesQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryBody {
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateCategoryBody {
    pub name: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListPostsQuery {
    pub issue_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_visible: Option<bool>,
    /// Title, url or description substring
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePostBody {
    pub issue_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: String,
    pub source_url: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub order: i64,
}

/// Absent fields are left untouched; `null` detaches the post from its issue or category.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdatePostBody {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>)]
    pub issue_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<i64>)]
    pub category_id: Option<Option<i64>>,
    pub title: Option<String>,
    pub source_url: Option<String>,
    pub short_description: Option<String>,
    pub is_visible: Option<bool>,
    pub order: Option<i64>,
}

pub fn create_admin_post_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/hide", post(hide_posts))
        .route("/posts/show", post(show_posts))
        .route("/posts/:id", get(get_post).put(update_post).delete(delete_post))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories",
    tag = "Admin",
    params(ListCategoriesQuery),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Categories in display order", body = Vec<CategoryResponse>)
    )
)]
pub async fn list_categories(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ListCategoriesQuery>,
) -> GatewayResult<Json<Vec<CategoryResponse>>> {
    let categories = state
        .services
        .posts
        .list_categories(query.search.as_deref())
        .await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    tag = "Admin",
    request_body = CategoryBody,
    security(("admin_token" = [])),
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 400, description = "Invalid category", body = ErrorResponse),
        (status = 409, description = "Name taken", body = ErrorResponse)
    )
)]
pub async fn create_category(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<CategoryBody>,
) -> GatewayResult<(StatusCode, Json<CategoryResponse>)> {
    let category = state
        .services
        .posts
        .create_category(CreateCategoryRequest {
            name: body.name,
            order: body.order,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(category.into())))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Category id")),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Category", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
pub async fn get_category(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<Json<CategoryResponse>> {
    let category = state.services.posts.get_category(id).await?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Category id")),
    request_body = UpdateCategoryBody,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Category updated", body = CategoryResponse),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
pub async fn update_category(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateCategoryBody>,
) -> GatewayResult<Json<CategoryResponse>> {
    let category = state
        .services
        .posts
        .update_category(
            id,
            UpdateCategoryRequest {
                name: body.name,
                order: body.order,
            },
        )
        .await?;
    Ok(Json(category.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Category id")),
    security(("admin_token" = [])),
    responses(
        (status = 204, description = "Category deleted, its posts are uncategorised"),
        (status = 404, description = "Category not found", body = ErrorResponse)
    )
)]
pub async fn delete_category(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<StatusCode> {
    state.services.posts.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/admin/posts",
    tag = "Admin",
    params(ListPostsQuery),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Matching posts", body = Vec<PostResponse>)
    )
)]
pub async fn list_posts(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ListPostsQuery>,
) -> GatewayResult<Json<Vec<PostResponse>>> {
    let visibility_only =
        query.issue_id.is_none() && query.category_id.is_none() && query.search.is_none();
    let posts = match query.is_visible {
        Some(true) if visibility_only => state.services.posts.visible().await?,
        Some(false) if visibility_only => state.services.posts.hidden().await?,
        is_visible => {
            let filter = PostFilter {
                issue_id: query.issue_id,
                category_id: query.category_id,
                is_visible,
                search: query.search,
            };
            state.services.posts.list(&filter).await?
        }
    };
    Ok(Json(posts.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    post,
    path = "/api/admin/posts",
    tag = "Admin",
    request_body = CreatePostBody,
    security(("admin_token" = [])),
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 400, description = "Invalid post or unknown issue/category", body = ErrorResponse)
    )
)]
pub async fn create_post(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<CreatePostBody>,
) -> GatewayResult<(StatusCode, Json<PostResponse>)> {
    let post = state
        .services
        .posts
        .create(CreatePostRequest {
            issue_id: body.issue_id,
            category_id: body.category_id,
            title: body.title,
            source_url: body.source_url,
            short_description: body.short_description,
            is_visible: body.is_visible,
            order: body.order,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[utoipa::path(
    get,
    path = "/api/admin/posts/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Post id")),
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn get_post(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<Json<PostResponse>> {
    let post = state.services.posts.get(id).await?;
    Ok(Json(post.into()))
}

#[utoipa::path(
    put,
    path = "/api/admin/posts/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Post id")),
    request_body = UpdatePostBody,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Post updated", body = PostResponse),
        (status = 400, description = "Invalid post or unknown issue/category", body = ErrorResponse),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn update_post(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostBody>,
) -> GatewayResult<Json<PostResponse>> {
    let post = state
        .services
        .posts
        .update(
            id,
            UpdatePostRequest {
                issue_id: body.issue_id,
                category_id: body.category_id,
                title: body.title,
                source_url: body.source_url,
                short_description: body.short_description,
                is_visible: body.is_visible,
                order: body.order,
            },
        )
        .await?;
    Ok(Json(post.into()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/posts/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Post id")),
    security(("admin_token" = [])),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 404, description = "Post not found", body = ErrorResponse)
    )
)]
pub async fn delete_post(
    State(state): State<Arc<GatewayState>>,
    Path(id): Path<i64>,
) -> GatewayResult<StatusCode> {
    state.services.posts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/admin/posts/hide",
    tag = "Admin",
    request_body = BulkIdsRequest,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Posts hidden", body = BulkUpdateResponse)
    )
)]
pub async fn hide_posts(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<BulkIdsRequest>,
) -> GatewayResult<Json<BulkUpdateResponse>> {
    let updated = state.services.posts.hide(&body.ids).await?;
    Ok(Json(BulkUpdateResponse {
        requested: body.ids.len(),
        updated,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/posts/show",
    tag = "Admin",
    request_body = BulkIdsRequest,
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "Posts made visible", body = BulkUpdateResponse)
    )
)]
pub async fn show_posts(
    State(state): State<Arc<GatewayState>>,
    Json(body): Json<BulkIdsRequest>,
) -> GatewayResult<Json<BulkUpdateResponse>> {
    let updated = state.services.posts.make_visible(&body.ids).await?;
    Ok(Json(BulkUpdateResponse {
        requested: body.ids.len(),
        updated,
    }))
}
