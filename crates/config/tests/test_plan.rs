//! Test plan for the `newsdesk-config` crate.
//!
//! These tests exercise the configuration loader across default handling,
//! file discovery, environment overrides, and normalisation of bad values.

use std::fs;
use std::path::{Path, PathBuf};

use serial_test::serial;
use tempfile::TempDir;

use newsdesk_config::{
    load, AdminConfig, AppConfig, HttpConfig, NewsletterConfig, MAX_CONFIRMATION_EXPIRE_DAYS,
};

const ENV_VARS_TO_RESET: &[&str] = &[
    "NEWSDESK_CONFIG",
    "NEWSDESK__ADMIN__API_TOKEN",
    "NEWSDESK__DATABASE__MAX_CONNECTIONS",
    "NEWSDESK__DATABASE__URL",
    "NEWSDESK__HTTP__ADDRESS",
    "NEWSDESK__HTTP__PORT",
    "NEWSDESK__NEWSLETTER__BATCH_SIZE",
    "NEWSDESK__NEWSLETTER__CONFIRMATION_EXPIRE_DAYS",
    "NEWSDESK__NEWSLETTER__FROM_ADDRESS",
    "NEWSDESK__NEWSLETTER__ISSUES_PER_PAGE",
    "NEWSDESK__NEWSLETTER__RESEND_COOLDOWN_MINUTES",
    "NEWSDESK__NEWSLETTER__SITE_URL",
];

struct TestContext {
    vars: Vec<(String, Option<String>)>,
    original_dir: Option<PathBuf>,
}

impl TestContext {
    fn new() -> Self {
        Self {
            vars: Vec::new(),
            original_dir: None,
        }
    }

    fn reset_environment(&mut self) {
        for key in ENV_VARS_TO_RESET {
            self.remove_var(key);
        }
    }

    fn set_var(&mut self, key: &str, value: impl AsRef<str>) {
        let previous = std::env::var(key).ok();
        std::env::set_var(key, value.as_ref());
        self.vars.push((key.to_string(), previous));
    }

    fn remove_var(&mut self, key: &str) {
        let previous = std::env::var(key).ok();
        std::env::remove_var(key);
        self.vars.push((key.to_string(), previous));
    }

    fn set_current_dir(&mut self, dir: &Path) {
        if self.original_dir.is_none() {
            self.original_dir =
                Some(std::env::current_dir().expect("failed to capture current directory"));
        }
        std::env::set_current_dir(dir).expect("failed to set current directory");
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if let Some(original) = self.original_dir.take() {
            let _ = std::env::set_current_dir(original);
        }

        while let Some((key, value)) = self.vars.pop() {
            match value {
                Some(val) => std::env::set_var(&key, val),
                None => std::env::remove_var(&key),
            }
        }
    }
}

fn write_config_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("failed to create config directories");
    }
    fs::write(path, contents).expect("failed to write config file");
}

fn isolated() -> (TempDir, TestContext) {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let mut ctx = TestContext::new();
    ctx.reset_environment();
    ctx.set_current_dir(temp_dir.path());
    (temp_dir, ctx)
}

#[test]
#[serial]
fn load_uses_default_values_when_no_files_found() {
    let (_temp_dir, _ctx) = isolated();

    let config = load().expect("configuration load should succeed without files");
    let defaults = AppConfig::default();

    assert_eq!(config.http.address, defaults.http.address);
    assert_eq!(config.http.port, defaults.http.port);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(
        config.database.max_connections,
        defaults.database.max_connections
    );
    assert_eq!(
        config.newsletter.confirmation_expire_days,
        defaults.newsletter.confirmation_expire_days
    );
    assert_eq!(
        config.newsletter.resend_cooldown_minutes,
        defaults.newsletter.resend_cooldown_minutes
    );
    assert_eq!(config.newsletter.site_url, defaults.newsletter.site_url);
    assert!(config.admin.api_token.is_none());
}

#[test]
#[serial]
fn load_picks_first_available_file_in_search_order() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "newsdesk.toml",
        r#"
        [http]
        port = 4242
        "#,
    );
    write_config_file(
        temp_dir.path(),
        "config/newsdesk.toml",
        r#"
        [http]
        port = 5151
        "#,
    );

    let config = load().expect("configuration load should pick the first file");
    assert_eq!(config.http.port, 4242);
}

#[test]
#[serial]
fn load_merges_partial_file_with_defaults() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "newsdesk.toml",
        r#"
        [newsletter]
        confirmation_expire_days = 7

        [database]
        max_connections = 50
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = AppConfig::default();

    assert_eq!(config.newsletter.confirmation_expire_days, 7);
    assert_eq!(
        config.newsletter.resend_cooldown_minutes,
        defaults.newsletter.resend_cooldown_minutes
    );
    assert_eq!(config.database.max_connections, 50);
    assert_eq!(config.database.url, defaults.database.url);
    assert_eq!(config.http.port, defaults.http.port);
}

#[test]
#[serial]
fn load_applies_environment_overrides() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "newsdesk.toml",
        r#"
        [http]
        port = 3030
        "#,
    );

    ctx.set_var("NEWSDESK__HTTP__PORT", "8080");
    ctx.set_var("NEWSDESK__NEWSLETTER__BATCH_SIZE", "10");

    let config = load().expect("configuration load should honour env overrides");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.newsletter.batch_size, 10);
}

#[test]
#[serial]
fn load_honours_explicit_config_path() {
    let (temp_dir, mut ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "elsewhere/custom.toml",
        r#"
        [newsletter]
        site_url = "https://news.example.com"
        "#,
    );
    ctx.set_var(
        "NEWSDESK_CONFIG",
        temp_dir.path().join("elsewhere/custom.toml").display().to_string(),
    );

    let config = load().expect("configuration load should read NEWSDESK_CONFIG");
    assert_eq!(config.newsletter.site_url, "https://news.example.com");
}

#[test]
#[serial]
fn load_reads_admin_token_from_env() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("NEWSDESK__ADMIN__API_TOKEN", "s3cret");

    let config = load().expect("configuration load should read admin token");
    assert_eq!(config.admin.api_token.as_deref(), Some("s3cret"));
}

#[test]
#[serial]
fn load_treats_blank_admin_token_as_disabled() {
    let (_temp_dir, mut ctx) = isolated();

    ctx.set_var("NEWSDESK__ADMIN__API_TOKEN", "   ");

    let config = load().expect("configuration load should succeed");
    assert!(config.admin.api_token.is_none());
}

#[test]
#[serial]
fn load_replaces_zero_batch_size_with_default() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "newsdesk.toml",
        r#"
        [newsletter]
        batch_size = 0
        issues_per_page = 0
        "#,
    );

    let config = load().expect("configuration load should succeed");
    let defaults = NewsletterConfig::default();
    assert_eq!(config.newsletter.batch_size, defaults.batch_size);
    assert_eq!(config.newsletter.issues_per_page, defaults.issues_per_page);
}

#[test]
#[serial]
fn load_rejects_out_of_range_expiry_and_cooldown() {
    let (temp_dir, mut ctx) = isolated();

    for (key, value) in [
        ("NEWSDESK__NEWSLETTER__CONFIRMATION_EXPIRE_DAYS", "0"),
        ("NEWSDESK__NEWSLETTER__CONFIRMATION_EXPIRE_DAYS", "-3"),
        ("NEWSDESK__NEWSLETTER__CONFIRMATION_EXPIRE_DAYS", "100000000"),
        ("NEWSDESK__NEWSLETTER__RESEND_COOLDOWN_MINUTES", "-1"),
        ("NEWSDESK__NEWSLETTER__RESEND_COOLDOWN_MINUTES", "10000000000"),
    ] {
        ctx.set_var(key, value);
        let error = load().expect_err("out of range value should be rejected");
        let message = error.to_string();
        assert!(
            message.contains(&key["NEWSDESK__NEWSLETTER__".len()..].to_lowercase()),
            "unexpected error message for {key}={value}: {message}"
        );
        ctx.remove_var(key);
    }

    write_config_file(
        temp_dir.path(),
        "newsdesk.toml",
        &format!(
            r#"
        [newsletter]
        confirmation_expire_days = {MAX_CONFIRMATION_EXPIRE_DAYS}
        resend_cooldown_minutes = 0
        "#
        ),
    );

    let config = load().expect("boundary values should load");
    assert_eq!(
        config.newsletter.confirmation_expire_days,
        MAX_CONFIRMATION_EXPIRE_DAYS
    );
    assert_eq!(config.newsletter.resend_cooldown_minutes, 0);
}

#[test]
#[serial]
fn load_errors_on_invalid_toml_contents() {
    let (temp_dir, _ctx) = isolated();

    write_config_file(
        temp_dir.path(),
        "newsdesk.toml",
        r#"
        [http]
        port = "not-a-number
        "#,
    );

    let error = load().expect_err("invalid TOML should cause load to fail");
    let message = error.to_string();
    assert!(
        message.contains("invalid configuration")
            || message.contains("unable to build configuration"),
        "unexpected error message: {message}"
    );
}

#[test]
fn admin_config_defaults_to_disabled() {
    assert!(AdminConfig::default().api_token.is_none());
}

#[test]
fn http_config_defaults_match_expected_host_and_port() {
    let defaults = HttpConfig::default();
    assert_eq!(defaults.address, "127.0.0.1");
    assert_eq!(defaults.port, 7070);
}
