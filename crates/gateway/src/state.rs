//! Shared application state for the gateway

use std::sync::Arc;

use newsdesk_config::AppConfig;
use newsdesk_newsfeed::{Mailer, NewsfeedServices};
use newsdesk_database::{DatabaseConnection, Pool};

use crate::error::{GatewayError, GatewayResult};

/// Shared application state containing all services
#[derive(Clone)]
pub struct GatewayState {
    pub services: NewsfeedServices,
    pub database: DatabaseConnection,
    /// Bearer token for `/api/admin`. `None` disables the admin API.
    pub admin_token: Option<String>,
}

impl GatewayState {
    pub fn new(pool: Pool, mailer: Arc<dyn Mailer>, config: &AppConfig) -> Self {
        Self {
            services: NewsfeedServices::new(pool.clone(), mailer, config.newsletter.clone()),
            database: DatabaseConnection::from_pool(pool),
            admin_token: config.admin.api_token.clone(),
        }
    }

    /// Open the configured database, migrate it and build the state.
    pub async fn from_config(config: &AppConfig, mailer: Arc<dyn Mailer>) -> GatewayResult<Self> {
        let pool = newsdesk_database::initialize_database(&config.database)
            .await
            .map_err(|e| GatewayError::DatabaseError(format!("Failed to initialize database: {e}")))?;

        Ok(Self::new(pool, mailer, config))
    }
}
