//! REST API endpoints for the gateway

pub mod admin_issues;
pub mod admin_newsletters;
pub mod admin_posts;
pub mod admin_subscribers;
pub mod health;
pub mod issues;
pub mod models;
pub mod subscriptions;

use std::sync::Arc;

use axum::{middleware as axum_middleware, Router};

use crate::middleware::require_admin;
use crate::state::GatewayState;

/// Public routes, mounted under `/api`.
pub fn create_public_routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(issues::create_issue_routes())
        .merge(subscriptions::create_subscription_routes())
}

/// Admin routes, mounted under `/api/admin` behind the bearer token guard.
pub fn create_admin_routes(state: Arc<GatewayState>) -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(admin_issues::create_admin_issue_routes())
        .merge(admin_posts::create_admin_post_routes())
        .merge(admin_newsletters::create_admin_newsletter_routes())
        .merge(admin_subscribers::create_admin_subscriber_routes())
        .route_layer(axum_middleware::from_fn_with_state(state, require_admin))
}

/// Create all REST API routes
pub fn create_rest_routes(state: Arc<GatewayState>) -> Router<Arc<GatewayState>> {
    Router::new()
        .merge(create_public_routes())
        .nest("/admin", create_admin_routes(state))
}

pub use models::ErrorResponse;
