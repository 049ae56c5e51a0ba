use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use newsdesk_config::load as load_config;
use newsdesk_database::{
    CreateCategoryRequest, CreateIssueRequest, CreateNewsletterRequest, CreatePostRequest,
    IssueFilter, IssueType, PostFilter, SubscriberFilter,
};
use newsdesk_gateway::{create_router, GatewayState};
use newsdesk_newsfeed::{NewsfeedError, NewsfeedServices};
use newsdesk_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "newsdesk-server")]
#[command(about = "Newsdesk backend (serves HTTP by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Send every scheduled newsletter that is due, then exit
    SendNewsletters,
    /// Print issues, posts, newsletters and subscribers
    DumpData,
    /// Seed the database with sample content
    SeedData,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;

    let config = load_config().context("failed to load configuration")?;
    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(services).await,
        Commands::SendNewsletters => send_newsletters(&services.newsfeed()).await,
        Commands::DumpData => dump_data(&services.newsfeed()).await,
        Commands::SeedData => seed_data(&services.newsfeed()).await,
    }
}

async fn run_server(services: BackendServices) -> anyhow::Result<()> {
    info!("starting Newsdesk backend");

    let state = GatewayState::new(
        services.db_pool.clone(),
        services.mailer.clone(),
        &services.config,
    );
    let app = create_router(state);

    let address = format!("{}:{}", services.config.http.address, services.config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(newsdesk_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn send_newsletters(newsfeed: &NewsfeedServices) -> anyhow::Result<()> {
    let report = newsfeed
        .newsletters
        .send_due(Utc::now())
        .await
        .context("failed to send due newsletters")?;

    println!(
        "Sent {} newsletter(s) in {} deliveries, skipped {}, failed {}",
        report.sent.len(),
        report.deliveries,
        report.skipped.len(),
        report.failed.len()
    );
    for failure in &report.failed {
        println!("- newsletter {}: {}", failure.newsletter_id, failure.reason);
    }
    Ok(())
}

async fn dump_data(newsfeed: &NewsfeedServices) -> anyhow::Result<()> {
    let issues = newsfeed
        .issues
        .list(&IssueFilter::default())
        .await
        .context("failed to fetch issues")?;

    println!("=== ISSUES ===");
    if issues.is_empty() {
        println!("No issues found in database");
    } else {
        println!(
            "{:<5} {:<8} {:<40} {:<14} {:<8} {:<25}",
            "ID", "Number", "Title", "Type", "Draft", "Publish Date"
        );
        println!("{}", "-".repeat(105));
        for issue in issues {
            println!(
                "{:<5} {:<8} {:<40} {:<14} {:<8} {:<25}",
                issue.id,
                issue.issue_number,
                truncate(&issue.title, 38),
                issue.issue_type.label(),
                issue.is_draft,
                issue.publish_date.to_rfc3339()
            );
        }
    }

    println!("\n=== CATEGORIES ===");
    let categories = newsfeed
        .posts
        .list_categories(None)
        .await
        .context("failed to fetch categories")?;
    if categories.is_empty() {
        println!("No categories found in database");
    } else {
        for category in categories {
            println!("{:<5} {:<6} {}", category.id, category.order, category.name);
        }
    }

    println!("\n=== POSTS ===");
    let posts = newsfeed
        .posts
        .list(&PostFilter::default())
        .await
        .context("failed to fetch posts")?;
    if posts.is_empty() {
        println!("No posts found in database");
    } else {
        println!(
            "{:<5} {:<7} {:<9} {:<40} {:<8} {}",
            "ID", "Issue", "Category", "Title", "Visible", "Source"
        );
        println!("{}", "-".repeat(120));
        for post in posts {
            println!(
                "{:<5} {:<7} {:<9} {:<40} {:<8} {}",
                post.id,
                display_id(post.issue_id),
                display_id(post.category_id),
                truncate(&post.title, 38),
                post.is_visible,
                post.source_url
            );
        }
    }

    println!("\n=== NEWSLETTERS ===");
    let newsletters = newsfeed
        .newsletters
        .list(None, None)
        .await
        .context("failed to fetch newsletters")?;
    if newsletters.is_empty() {
        println!("No newsletters found in database");
    } else {
        for newsletter in newsletters {
            println!(
                "{:<5} issue {:<5} sent={:<6} schedule={:<27} {}",
                newsletter.id,
                newsletter.issue_id,
                newsletter.is_sent,
                newsletter
                    .schedule
                    .map(|s| s.to_rfc3339())
                    .unwrap_or_else(|| "NULL".to_string()),
                newsletter.subject
            );
        }
    }

    println!("\n=== SUBSCRIBERS ===");
    let subscribers = newsfeed
        .subscribers
        .list(&SubscriberFilter::default())
        .await
        .context("failed to fetch subscribers")?;
    if subscribers.is_empty() {
        println!("No subscribers found in database");
    } else {
        for summary in subscribers {
            println!(
                "{:<5} {:<40} {:<22} expired={}",
                summary.subscriber.id,
                summary.subscriber.email_address,
                summary.state.as_str(),
                summary.token_expired
            );
        }
    }

    Ok(())
}

async fn seed_data(newsfeed: &NewsfeedServices) -> anyhow::Result<()> {
    let now = Utc::now();

    let first = match newsfeed
        .issues
        .create(CreateIssueRequest {
            title: "Welcome to Newsdesk".to_string(),
            issue_number: 1,
            publish_date: now - Duration::days(7),
            issue_type: IssueType::Weekly,
            short_description: Some("The first collection of links".to_string()),
            is_draft: false,
        })
        .await
    {
        Ok(issue) => issue,
        Err(NewsfeedError::Duplicate(_)) => {
            println!("Database already seeded (issue #1 exists)");
            return Ok(());
        }
        Err(err) => return Err(err).context("failed to insert issue #1"),
    };

    let upcoming = newsfeed
        .issues
        .create(CreateIssueRequest {
            title: "Coming up next".to_string(),
            issue_number: 2,
            publish_date: now + Duration::days(7),
            issue_type: IssueType::Weekly,
            short_description: None,
            is_draft: true,
        })
        .await
        .context("failed to insert issue #2")?;

    let articles = newsfeed
        .posts
        .create_category(CreateCategoryRequest {
            name: "Articles".to_string(),
            order: 0,
        })
        .await
        .context("failed to insert category")?;
    let tools = newsfeed
        .posts
        .create_category(CreateCategoryRequest {
            name: "Tools".to_string(),
            order: 1,
        })
        .await
        .context("failed to insert category")?;

    let posts = [
        (first.id, articles.id, "Reading SQLite query plans", "https://sqlite.org/eqp.html"),
        (first.id, tools.id, "A tour of tracing", "https://docs.rs/tracing"),
        (upcoming.id, articles.id, "Structured concurrency", "https://tokio.rs/blog"),
    ];
    for (order, (issue_id, category_id, title, url)) in posts.into_iter().enumerate() {
        newsfeed
            .posts
            .create(CreatePostRequest {
                issue_id: Some(issue_id),
                category_id: Some(category_id),
                title: title.to_string(),
                source_url: url.to_string(),
                short_description: String::new(),
                is_visible: true,
                order: order as i64,
            })
            .await
            .with_context(|| format!("failed to insert post '{title}'"))?;
    }

    newsfeed
        .newsletters
        .create(CreateNewsletterRequest {
            issue_id: first.id,
            subject: "Newsdesk #1: Welcome".to_string(),
            schedule: Some(now),
        })
        .await
        .context("failed to insert newsletter")?;

    println!("Database seeded with sample data:");
    println!("- 2 issues (one released, one draft)");
    println!("- 2 categories, 3 posts");
    println!("- 1 newsletter scheduled now");
    println!("Run 'dump-data' to see the inserted data");

    Ok(())
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let cut: String = value.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        value.to_string()
    }
}

fn display_id(id: Option<i64>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| "NULL".to_string())
}
