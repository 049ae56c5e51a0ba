//! # Newsdesk Gateway Crate
//!
//! HTTP surface for Newsdesk: public issue pages, the subscription flow and
//! the token-protected admin API, all routed onto the newsfeed services.
//!
//! ## Architecture
//!
//! - **REST**: JSON endpoints with OpenAPI documentation
//! - **State**: Shared services and the admin token
//! - **Middleware**: Admin authentication, CORS and request tracing
//!
//! ## Usage
//!
//! ```rust,ignore
//! use newsdesk_gateway::{create_router, GatewayState};
//!
//! let state = GatewayState::from_config(&config, mailer).await?;
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod middleware;
pub mod rest;
pub mod state;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use std::sync::Arc;

use axum::{routing::get, Router};

/// Create the main application router with all routes
pub fn create_router(state: GatewayState) -> Router {
    let arc_state = Arc::new(state);

    #[allow(unused_mut)]
    let mut router = Router::new()
        .route("/health", get(rest::health::health_check))
        .nest("/api", rest::create_rest_routes(arc_state.clone()))
        .with_state(arc_state)
        .layer(middleware::create_cors_middleware())
        .layer(middleware::create_trace_middleware());

    #[cfg(debug_assertions)]
    {
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        router = router
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
}

#[cfg(debug_assertions)]
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        rest::health::health_check,
        rest::issues::list_issues,
        rest::issues::latest_issue,
        rest::issues::get_issue,
        rest::subscriptions::subscribe,
        rest::subscriptions::confirm,
        rest::subscriptions::unsubscribe,
        rest::admin_issues::list_issues,
        rest::admin_issues::create_issue,
        rest::admin_issues::get_issue,
        rest::admin_issues::update_issue,
        rest::admin_issues::delete_issue,
        rest::admin_issues::publish_issues,
        rest::admin_issues::draft_issues,
        rest::admin_posts::list_categories,
        rest::admin_posts::create_category,
        rest::admin_posts::get_category,
        rest::admin_posts::update_category,
        rest::admin_posts::delete_category,
        rest::admin_posts::list_posts,
        rest::admin_posts::create_post,
        rest::admin_posts::get_post,
        rest::admin_posts::update_post,
        rest::admin_posts::delete_post,
        rest::admin_posts::hide_posts,
        rest::admin_posts::show_posts,
        rest::admin_newsletters::list_newsletters,
        rest::admin_newsletters::create_newsletter,
        rest::admin_newsletters::get_newsletter,
        rest::admin_newsletters::delete_newsletter,
        rest::admin_newsletters::send_newsletters,
        rest::admin_newsletters::send_due_newsletters,
        rest::admin_subscribers::list_subscribers,
        rest::admin_subscribers::list_active_subscribers,
    ),
    components(
        schemas(
            rest::health::HealthResponse,
            rest::models::ErrorResponse,
            rest::models::IssueResponse,
            rest::models::IssuePageResponse,
            rest::models::IssueDetailResponse,
            rest::models::SectionResponse,
            rest::models::CategoryResponse,
            rest::models::PostResponse,
            rest::models::NewsletterResponse,
            rest::models::DispatchReportResponse,
            rest::models::DispatchFailureResponse,
            rest::models::SubscriberResponse,
            rest::models::BulkIdsRequest,
            rest::models::BulkUpdateResponse,
            rest::subscriptions::EmailRequest,
            rest::subscriptions::SubscriptionStatusResponse,
            rest::admin_issues::CreateIssueBody,
            rest::admin_issues::UpdateIssueBody,
            rest::admin_posts::CategoryBody,
            rest::admin_posts::UpdateCategoryBody,
            rest::admin_posts::CreatePostBody,
            rest::admin_posts::UpdatePostBody,
            rest::admin_newsletters::CreateNewsletterBody,
        )
    ),
    modifiers(&AdminTokenScheme),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Issues", description = "Released issues"),
        (name = "Subscriptions", description = "Newsletter opt-in and opt-out"),
        (name = "Admin", description = "Content and newsletter administration"),
    )
)]
struct ApiDoc;

#[cfg(debug_assertions)]
struct AdminTokenScheme;

#[cfg(debug_assertions)]
impl utoipa::Modify for AdminTokenScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
