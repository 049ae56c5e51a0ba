use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Longest accepted confirmation window: one hundred years.
pub const MAX_CONFIRMATION_EXPIRE_DAYS: i64 = 36_500;
/// Longest accepted resend cooldown: one year.
pub const MAX_RESEND_COOLDOWN_MINUTES: i64 = 525_600;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "newsdesk.toml",
    "config/newsdesk.toml",
    "crates/config/newsdesk.toml",
    "../newsdesk.toml",
    "../config/newsdesk.toml",
    "../crates/config/newsdesk.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub newsletter: NewsletterConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://newsdesk.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Subscription and dispatch settings.
///
/// ```
/// use newsdesk_config::NewsletterConfig;
///
/// let newsletter = NewsletterConfig::default();
/// assert_eq!(newsletter.confirmation_expire_days, 3);
/// assert_eq!(newsletter.resend_cooldown_minutes, 5);
/// assert_eq!(newsletter.batch_size, 50);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsletterConfig {
    /// Days after which a verification token stops being accepted.
    #[serde(default = "NewsletterConfig::default_expire_days")]
    pub confirmation_expire_days: i64,
    /// Minimum gap between two verification emails to the same address.
    #[serde(default = "NewsletterConfig::default_cooldown")]
    pub resend_cooldown_minutes: i64,
    #[serde(default = "NewsletterConfig::default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "NewsletterConfig::default_issues_per_page")]
    pub issues_per_page: u32,
    #[serde(default = "NewsletterConfig::default_site_url")]
    pub site_url: String,
    #[serde(default = "NewsletterConfig::default_from_address")]
    pub from_address: String,
}

impl NewsletterConfig {
    const fn default_expire_days() -> i64 {
        3
    }

    const fn default_cooldown() -> i64 {
        5
    }

    const fn default_batch_size() -> usize {
        50
    }

    const fn default_issues_per_page() -> u32 {
        15
    }

    fn default_site_url() -> String {
        "http://127.0.0.1:7070".to_string()
    }

    fn default_from_address() -> String {
        "newsletter@localhost".to_string()
    }
}

impl Default for NewsletterConfig {
    fn default() -> Self {
        Self {
            confirmation_expire_days: Self::default_expire_days(),
            resend_cooldown_minutes: Self::default_cooldown(),
            batch_size: Self::default_batch_size(),
            issues_per_page: Self::default_issues_per_page(),
            site_url: Self::default_site_url(),
            from_address: Self::default_from_address(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    /// Bearer token for the admin API. Admin routes are disabled when unset.
    #[serde(default)]
    pub api_token: Option<String>,
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use newsdesk_config::load;
///
/// std::env::remove_var("NEWSDESK_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default(
            "newsletter.confirmation_expire_days",
            defaults.newsletter.confirmation_expire_days,
        )?
        .set_default(
            "newsletter.resend_cooldown_minutes",
            defaults.newsletter.resend_cooldown_minutes,
        )?
        .set_default(
            "newsletter.batch_size",
            i64::try_from(defaults.newsletter.batch_size).unwrap_or(i64::MAX),
        )?
        .set_default(
            "newsletter.issues_per_page",
            i64::from(defaults.newsletter.issues_per_page),
        )?
        .set_default("newsletter.site_url", defaults.newsletter.site_url.clone())?
        .set_default(
            "newsletter.from_address",
            defaults.newsletter.from_address.clone(),
        )?;

    let environment_overrides = config::Environment::with_prefix("NEWSDESK").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("NEWSDESK_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via NEWSDESK_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.newsletter.batch_size == 0 {
        config.newsletter.batch_size = NewsletterConfig::default_batch_size();
    }
    if config.newsletter.issues_per_page == 0 {
        config.newsletter.issues_per_page = NewsletterConfig::default_issues_per_page();
    }
    anyhow::ensure!(
        (1..=MAX_CONFIRMATION_EXPIRE_DAYS).contains(&config.newsletter.confirmation_expire_days),
        "newsletter.confirmation_expire_days must be between 1 and {MAX_CONFIRMATION_EXPIRE_DAYS}, got {}",
        config.newsletter.confirmation_expire_days
    );
    anyhow::ensure!(
        (0..=MAX_RESEND_COOLDOWN_MINUTES).contains(&config.newsletter.resend_cooldown_minutes),
        "newsletter.resend_cooldown_minutes must be between 0 and {MAX_RESEND_COOLDOWN_MINUTES}, got {}",
        config.newsletter.resend_cooldown_minutes
    );
    if config
        .admin
        .api_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        config.admin.api_token = None;
    }

    debug!(
        http = ?config.http,
        database = ?config.database,
        newsletter = ?config.newsletter,
        admin_enabled = config.admin.api_token.is_some(),
        "loaded backend configuration"
    );
    Ok(config)
}
