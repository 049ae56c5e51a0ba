use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use newsdesk_config::AppConfig;
use newsdesk_database::format_timestamp;
use newsdesk_gateway::{create_router, GatewayState};
use newsdesk_newsfeed::MemoryMailer;
use newsdesk_runtime::BackendServices;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

const TEST_TOKEN: &str = "test-admin-token";

struct TestApp {
    router: Router,
    pool: SqlitePool,
    mailer: MemoryMailer,
    _db_dir: TempDir,
}

struct TestResponse {
    status: StatusCode,
    text: String,
    json: Value,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_admin_token(Some(TEST_TOKEN)).await
    }

    async fn with_admin_token(admin_token: Option<&str>) -> Self {
        let db_dir = TempDir::new().expect("create temp dir");
        let db_path = db_dir.path().join("newsdesk-test.db");

        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", db_path.to_string_lossy());
        config.database.max_connections = 5;
        config.newsletter.site_url = "https://news.example.com".to_string();
        config.newsletter.batch_size = 2;
        config.admin.api_token = admin_token.map(str::to_string);

        let mailer = MemoryMailer::new();
        let services = BackendServices::initialise_with_mailer(&config, Arc::new(mailer.clone()))
            .await
            .expect("initialise backend services");

        let state = GatewayState::new(
            services.db_pool.clone(),
            services.mailer.clone(),
            &services.config,
        );

        Self {
            router: create_router(state),
            pool: services.db_pool.clone(),
            mailer,
            _db_dir: db_dir,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let app = self.router.clone();
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = if let Some(json_body) = body {
            let bytes = serde_json::to_vec(&json_body).expect("serialize request body");
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(bytes)
        } else {
            Body::empty()
        };

        let response = app
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("dispatch request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect response body")
            .to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap_or_default();
        let json = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::Null)
        };

        TestResponse { status, text, json }
    }

    async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, None).await
    }

    async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), None).await
    }

    async fn admin(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(method, uri, body, Some(TEST_TOKEN)).await
    }

    async fn create_issue(&self, number: i64, days_ago: i64, is_draft: bool) -> i64 {
        let response = self
            .admin(
                Method::POST,
                "/api/admin/issues",
                Some(json!({
                    "title": format!("Issue {number}"),
                    "issue_number": number,
                    "publish_date": Utc::now() - Duration::days(days_ago),
                    "issue_type": "weekly",
                    "short_description": format!("Links for issue {number}"),
                    "is_draft": is_draft,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        response.json["id"].as_i64().expect("issue id")
    }

    /// Subscribe and confirm through the public API.
    async fn confirmed_subscriber(&self, email: &str) {
        let response = self.post("/api/subscribe", json!({ "email": email })).await;
        assert_eq!(response.status, StatusCode::ACCEPTED, "{}", response.text);
        let token = self.last_token_for(email).await;
        let confirmed = self
            .get(&format!("/api/subscribe/confirm/{token}"))
            .await;
        assert_eq!(confirmed.status, StatusCode::OK, "{}", confirmed.text);
    }

    async fn last_token_for(&self, email: &str) -> String {
        let messages = self.mailer.messages_to(email).await;
        let body = &messages.last().expect("verification email").body;
        let (_, rest) = body
            .split_once("/api/subscribe/confirm/")
            .expect("confirmation link in body");
        rest.split_whitespace()
            .next()
            .expect("token after link")
            .to_string()
    }
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;
    let response = app.get("/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["status"], "ok");
    assert_eq!(response.json["database"], "ok");
}

#[tokio::test]
async fn admin_routes_require_the_bearer_token() {
    let app = TestApp::new().await;

    let missing = app.request(Method::GET, "/api/admin/issues", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json["error"], "401");

    let wrong = app
        .request(Method::GET, "/api/admin/issues", None, Some("nope"))
        .await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let ok = app.admin(Method::GET, "/api/admin/issues", None).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json, json!([]));
}

#[tokio::test]
async fn admin_routes_are_disabled_without_a_configured_token() {
    let app = TestApp::with_admin_token(None).await;
    let response = app
        .request(Method::GET, "/api/admin/subscribers", None, Some("anything"))
        .await;
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);

    // Public routes keep working.
    assert_eq!(app.get("/api/issues").await.status, StatusCode::OK);
}

#[tokio::test]
async fn only_released_issues_are_public() {
    let app = TestApp::new().await;
    let released = app.create_issue(1, 3, false).await;
    let draft = app.create_issue(2, 1, true).await;
    app.create_issue(3, -5, false).await;

    let listing = app.get("/api/issues").await;
    assert_eq!(listing.status, StatusCode::OK);
    assert_eq!(listing.json["total"], 1);
    assert_eq!(listing.json["items"][0]["id"], released);
    assert_eq!(listing.json["items"][0]["is_published"], true);

    assert_eq!(app.get("/api/issues/2").await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/issues/3").await.status, StatusCode::NOT_FOUND);

    let unreleased = app
        .admin(Method::GET, "/api/admin/issues?unreleased=true", None)
        .await;
    assert_eq!(unreleased.json.as_array().map(Vec::len), Some(2));

    let published = app
        .admin(
            Method::POST,
            "/api/admin/issues/publish",
            Some(json!({ "ids": [draft] })),
        )
        .await;
    assert_eq!(published.json["updated"], 1);

    let latest = app.get("/api/issues/latest").await;
    assert_eq!(latest.status, StatusCode::OK);
    assert_eq!(latest.json["issue"]["issue_number"], 2);
}

#[tokio::test]
async fn admin_issue_search_matches_text_and_number() {
    let app = TestApp::new().await;
    app.create_issue(1, 10, false).await;
    app.create_issue(2, 3, false).await;
    app.create_issue(12, 0, true).await;

    let by_text = app
        .admin(Method::GET, "/api/admin/issues?search=issue%2012", None)
        .await;
    assert_eq!(by_text.status, StatusCode::OK, "{}", by_text.text);
    let numbers: Vec<i64> = by_text
        .json
        .as_array()
        .expect("issue array")
        .iter()
        .filter_map(|i| i["issue_number"].as_i64())
        .collect();
    assert_eq!(numbers, vec![12]);

    let by_number = app
        .admin(Method::GET, "/api/admin/issues?search=2", None)
        .await;
    let numbers: Vec<i64> = by_number
        .json
        .as_array()
        .expect("issue array")
        .iter()
        .filter_map(|i| i["issue_number"].as_i64())
        .collect();
    assert!(numbers.contains(&2) && numbers.contains(&12) && !numbers.contains(&1));

    let published_only = app
        .admin(Method::GET, "/api/admin/issues?search=2&is_draft=false", None)
        .await;
    assert_eq!(published_only.json.as_array().map(Vec::len), Some(1));
    assert_eq!(published_only.json[0]["issue_number"], 2);
}

#[tokio::test]
async fn issue_detail_groups_visible_posts_by_category() {
    let app = TestApp::new().await;
    let issue_id = app.create_issue(7, 1, false).await;

    let tools = app
        .admin(
            Method::POST,
            "/api/admin/categories",
            Some(json!({ "name": "Tools", "order": 2 })),
        )
        .await;
    let articles = app
        .admin(
            Method::POST,
            "/api/admin/categories",
            Some(json!({ "name": "Articles", "order": 1 })),
        )
        .await;
    assert_eq!(tools.status, StatusCode::CREATED);

    let posts = [
        (tools.json["id"].clone(), "ripgrep", true),
        (articles.json["id"].clone(), "Async in depth", true),
        (Value::Null, "Loose link", true),
        (articles.json["id"].clone(), "Hidden draft", false),
    ];
    for (category_id, title, is_visible) in posts {
        let response = app
            .admin(
                Method::POST,
                "/api/admin/posts",
                Some(json!({
                    "issue_id": issue_id,
                    "category_id": category_id,
                    "title": title,
                    "source_url": "https://example.com/post",
                    "is_visible": is_visible,
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    }

    let detail = app.get("/api/issues/7").await;
    assert_eq!(detail.status, StatusCode::OK);
    let sections = detail.json["sections"].as_array().expect("sections");
    let names: Vec<Value> = sections
        .iter()
        .map(|s| s["category"]["name"].clone())
        .collect();
    assert_eq!(names, vec![json!("Articles"), json!("Tools"), Value::Null]);
    assert_eq!(sections[0]["posts"].as_array().map(Vec::len), Some(1));

    let unknown_issue = app
        .admin(
            Method::POST,
            "/api/admin/posts",
            Some(json!({
                "issue_id": 999,
                "title": "Orphan",
                "source_url": "https://example.com",
            })),
        )
        .await;
    assert_eq!(unknown_issue.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_issue_numbers_conflict() {
    let app = TestApp::new().await;
    app.create_issue(1, 1, false).await;

    let duplicate = app
        .admin(
            Method::POST,
            "/api/admin/issues",
            Some(json!({
                "title": "Again",
                "issue_number": 1,
                "publish_date": Utc::now(),
            })),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let bad_type = app
        .admin(
            Method::POST,
            "/api/admin/issues",
            Some(json!({
                "title": "Yearly",
                "issue_number": 2,
                "publish_date": Utc::now(),
                "issue_type": "yearly",
            })),
        )
        .await;
    assert_eq!(bad_type.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscription_follows_the_double_opt_in() {
    let app = TestApp::new().await;

    let invalid = app.post("/api/subscribe", json!({ "email": "not-an-email" })).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);

    let requested = app
        .post("/api/subscribe", json!({ "email": " Reader@Example.com " }))
        .await;
    assert_eq!(requested.status, StatusCode::ACCEPTED, "{}", requested.text);
    assert_eq!(requested.json["state"], "verification_pending");
    assert_eq!(requested.json["email_address"], "reader@example.com");

    let throttled = app
        .post("/api/subscribe", json!({ "email": "reader@example.com" }))
        .await;
    assert_eq!(throttled.status, StatusCode::TOO_MANY_REQUESTS);

    let token = app.last_token_for("reader@example.com").await;
    let confirmed = app.get(&format!("/api/subscribe/confirm/{token}")).await;
    assert_eq!(confirmed.status, StatusCode::OK);
    assert_eq!(confirmed.json["state"], "subscribed");

    let reused = app.get(&format!("/api/subscribe/confirm/{token}")).await;
    assert_eq!(reused.status, StatusCode::NOT_FOUND);

    let again = app
        .post("/api/subscribe", json!({ "email": "reader@example.com" }))
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let active = app
        .admin(Method::GET, "/api/admin/subscribers/active", None)
        .await;
    assert_eq!(active.json.as_array().map(Vec::len), Some(1));
    assert!(active.json[0].get("token").is_none());

    let unsubscribed = app
        .post("/api/unsubscribe", json!({ "email": "reader@example.com" }))
        .await;
    assert_eq!(unsubscribed.status, StatusCode::OK);
    assert_eq!(unsubscribed.json["state"], "unsubscribed");

    let twice = app
        .post("/api/unsubscribe", json!({ "email": "reader@example.com" }))
        .await;
    assert_eq!(twice.status, StatusCode::CONFLICT);

    let replayed = app.get(&format!("/api/subscribe/confirm/{token}")).await;
    assert_eq!(replayed.status, StatusCode::NOT_FOUND);
    let active = app
        .admin(Method::GET, "/api/admin/subscribers/active", None)
        .await;
    assert_eq!(active.json, json!([]));
}

#[tokio::test]
async fn expired_confirmation_token_is_gone() {
    let app = TestApp::new().await;
    app.post("/api/subscribe", json!({ "email": "late@example.com" }))
        .await;
    let token = app.last_token_for("late@example.com").await;

    sqlx::query("UPDATE subscribers SET verification_sent_date = ? WHERE email_address = ?")
        .bind(format_timestamp(Utc::now() - Duration::days(10)))
        .bind("late@example.com")
        .execute(&app.pool)
        .await
        .expect("backdate verification");

    let response = app.get(&format!("/api/subscribe/confirm/{token}")).await;
    assert_eq!(response.status, StatusCode::GONE);

    let listing = app
        .admin(Method::GET, "/api/admin/subscribers?search=late", None)
        .await;
    assert_eq!(listing.json[0]["token_expired"], true);
    assert_eq!(listing.json[0]["state"], "verification_pending");
}

#[tokio::test]
async fn newsletters_are_sent_once_to_active_subscribers() {
    let app = TestApp::new().await;
    let issue_id = app.create_issue(1, 1, false).await;
    let draft_id = app.create_issue(2, 1, true).await;
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        app.confirmed_subscriber(email).await;
    }
    app.post("/api/subscribe", json!({ "email": "pending@example.com" }))
        .await;
    app.mailer.clear().await;

    let newsletter = app
        .admin(
            Method::POST,
            "/api/admin/newsletters",
            Some(json!({ "issue_id": issue_id, "subject": "Issue 1 is out" })),
        )
        .await;
    assert_eq!(newsletter.status, StatusCode::CREATED, "{}", newsletter.text);
    let unreleased = app
        .admin(
            Method::POST,
            "/api/admin/newsletters",
            Some(json!({ "issue_id": draft_id, "subject": "Not yet" })),
        )
        .await;

    let ids = json!({ "ids": [newsletter.json["id"], unreleased.json["id"]] });
    let report = app
        .admin(Method::POST, "/api/admin/newsletters/send", Some(ids.clone()))
        .await;
    assert_eq!(report.status, StatusCode::OK, "{}", report.text);
    assert_eq!(report.json["sent"], json!([newsletter.json["id"]]));
    assert_eq!(report.json["deliveries"], 3);
    assert_eq!(report.json["failed"][0]["newsletter_id"], unreleased.json["id"]);

    let delivered = app.mailer.messages().await;
    assert_eq!(delivered.len(), 3);
    assert!(delivered.iter().all(|m| m.subject == "Issue 1 is out"));
    assert!(delivered
        .iter()
        .all(|m| m.body.contains("https://news.example.com/api/unsubscribe")));
    assert!(app.mailer.messages_to("pending@example.com").await.is_empty());

    let resend = app
        .admin(Method::POST, "/api/admin/newsletters/send", Some(ids))
        .await;
    assert_eq!(resend.json["skipped"], json!([newsletter.json["id"]]));
    assert_eq!(app.mailer.messages().await.len(), 3);

    let sent = app
        .admin(Method::GET, "/api/admin/newsletters?is_sent=true", None)
        .await;
    assert_eq!(sent.json.as_array().map(Vec::len), Some(1));
    assert!(sent.json[0]["sent_at"].is_string());
}

#[tokio::test]
async fn send_due_only_picks_scheduled_newsletters() {
    let app = TestApp::new().await;
    let issue_id = app.create_issue(1, 2, false).await;
    app.confirmed_subscriber("reader@example.com").await;
    app.mailer.clear().await;

    for (subject, schedule) in [
        ("due", Some(Utc::now() - Duration::hours(1))),
        ("later", Some(Utc::now() + Duration::days(1))),
        ("manual", None),
    ] {
        let response = app
            .admin(
                Method::POST,
                "/api/admin/newsletters",
                Some(json!({ "issue_id": issue_id, "subject": subject, "schedule": schedule })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    }

    let report = app
        .admin(Method::POST, "/api/admin/newsletters/send-due", None)
        .await;
    assert_eq!(report.status, StatusCode::OK);
    assert_eq!(report.json["sent"].as_array().map(Vec::len), Some(1));

    let messages = app.mailer.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].subject, "due");
}

#[tokio::test]
async fn bulk_visibility_and_post_detach() {
    let app = TestApp::new().await;
    let issue_id = app.create_issue(1, 1, false).await;

    let mut ids = Vec::new();
    for title in ["one", "two"] {
        let response = app
            .admin(
                Method::POST,
                "/api/admin/posts",
                Some(json!({
                    "issue_id": issue_id,
                    "title": title,
                    "source_url": "https://example.com",
                    "is_visible": true,
                })),
            )
            .await;
        ids.push(response.json["id"].clone());
    }

    let hidden = app
        .admin(
            Method::POST,
            "/api/admin/posts/hide",
            Some(json!({ "ids": ids })),
        )
        .await;
    assert_eq!(hidden.json["updated"], 2);

    let visible = app
        .admin(Method::GET, "/api/admin/posts?is_visible=true", None)
        .await;
    assert_eq!(visible.json, json!([]));

    let hidden_listing = app
        .admin(Method::GET, "/api/admin/posts?is_visible=false", None)
        .await;
    assert_eq!(hidden_listing.json.as_array().map(Vec::len), Some(2));
    let hidden_match = app
        .admin(Method::GET, "/api/admin/posts?is_visible=false&search=two", None)
        .await;
    assert_eq!(hidden_match.json.as_array().map(Vec::len), Some(1));
    assert_eq!(hidden_match.json[0]["title"], "two");

    let detached = app
        .admin(
            Method::PUT,
            &format!("/api/admin/posts/{}", ids[0]),
            Some(json!({ "issue_id": null })),
        )
        .await;
    assert_eq!(detached.status, StatusCode::OK, "{}", detached.text);
    assert!(detached.json["issue_id"].is_null());
    assert_eq!(detached.json["title"], "one");
}
