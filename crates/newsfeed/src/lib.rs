//! Newsdesk newsfeed services
//!
//! Issues are released once they leave draft and their publish date has
//! passed. Posts hang off issues and categories. Subscribers go through a
//! double opt-in: a verification email carries a single-use token that
//! expires after a configurable number of days, and resending is throttled.
//! Newsletters deliver a rendered issue to every active subscriber.

use std::sync::Arc;

use newsdesk_config::NewsletterConfig;
use newsdesk_database::{
    CategoryRepository, IssueRepository, NewsletterRepository, PostRepository,
    Pool, SubscriberRepository,
};

pub mod error;
pub mod mailer;
pub mod services;
pub mod validation;

pub use error::{NewsfeedError, NewsfeedResult};
pub use mailer::{LogMailer, Mailer, MemoryMailer, OutgoingEmail};
pub use services::*;

/// Every service wired to one connection pool and mailer.
#[derive(Clone)]
pub struct NewsfeedServices {
    pub issues: IssueService,
    pub posts: PostService,
    pub newsletters: NewsletterService,
    pub subscribers: Arc<SubscriberService>,
}

impl NewsfeedServices {
    pub fn new(pool: Pool, mailer: Arc<dyn Mailer>, settings: NewsletterConfig) -> Self {
        let issue_repo = IssueRepository::new(pool.clone());
        let post_repo = PostRepository::new(pool.clone());
        let category_repo = CategoryRepository::new(pool.clone());
        let subscriber_repo = SubscriberRepository::new(pool.clone());

        Self {
            issues: IssueService::new(
                issue_repo.clone(),
                post_repo.clone(),
                settings.issues_per_page,
            ),
            posts: PostService::new(post_repo.clone(), category_repo, issue_repo.clone()),
            newsletters: NewsletterService::new(
                NewsletterRepository::new(pool),
                issue_repo,
                post_repo,
                subscriber_repo.clone(),
                mailer.clone(),
                settings.clone(),
            ),
            subscribers: Arc::new(SubscriberService::new(subscriber_repo, mailer, settings)),
        }
    }
}
