use std::sync::Arc;

use anyhow::{Context, Result};
use newsdesk_config::AppConfig;
use newsdesk_database::initialize_database;
use newsdesk_newsfeed::{LogMailer, Mailer, NewsfeedServices};
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub mailer: Arc<dyn Mailer>,
    pub config: AppConfig,
}

impl BackendServices {
    /// Open and migrate the database and use the logging mail transport.
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        Self::initialise_with_mailer(config, Arc::new(LogMailer)).await
    }

    pub async fn initialise_with_mailer(
        config: &AppConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        info!(
            url = %config.database.url,
            max_connections = config.database.max_connections,
            "database ready"
        );
        if config.admin.api_token.is_none() {
            info!("no admin token configured, admin API disabled");
        }

        Ok(Self {
            db_pool,
            mailer,
            config: config.clone(),
        })
    }

    pub fn newsfeed(&self) -> NewsfeedServices {
        NewsfeedServices::new(
            self.db_pool.clone(),
            Arc::clone(&self.mailer),
            self.config.newsletter.clone(),
        )
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
