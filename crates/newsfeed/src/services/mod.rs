//! Business services over the database repositories

pub mod issue_service;
pub mod newsletter_service;
pub mod post_service;
pub mod subscriber_service;

#[cfg(test)]
mod memory_store;

pub use issue_service::{group_sections, IssueDetail, IssuePage, IssueSection, IssueService};
pub use newsletter_service::{
    render_body, DispatchFailure, DispatchOutcome, DispatchReport, NewsletterService,
};
pub use post_service::PostService;
pub use subscriber_service::{
    SubscriberService, SubscriberStore, SubscriberSummary, SubscriptionRequest,
    MAX_TOKEN_ATTEMPTS,
};
