//! Request and response bodies shared by the REST endpoints

use chrono::{DateTime, Utc};
use newsdesk_database::{Issue, IssueType, Newsletter, Post, PostCategory, Subscriber};
use newsdesk_newsfeed::{
    DispatchReport, IssueDetail, IssuePage, IssueSection, SubscriberSummary,
};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// Tells a missing field (`None`) apart from an explicit `null` (`Some(None)`).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssueResponse {
    pub id: i64,
    pub title: String,
    pub issue_number: i64,
    pub publish_date: DateTime<Utc>,
    /// `daily`, `weekly` or `monthly`
    pub issue_type: String,
    pub short_description: Option<String>,
    pub is_draft: bool,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Issue> for IssueResponse {
    fn from(issue: Issue) -> Self {
        let is_published = issue.is_published(Utc::now());
        let issue_type = match issue.issue_type {
            IssueType::Daily => "daily",
            IssueType::Weekly => "weekly",
            IssueType::Monthly => "monthly",
        };
        Self {
            id: issue.id,
            title: issue.title,
            issue_number: issue.issue_number,
            publish_date: issue.publish_date,
            issue_type: issue_type.to_string(),
            short_description: issue.short_description,
            is_draft: issue.is_draft,
            is_published,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssuePageResponse {
    pub items: Vec<IssueResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

impl From<IssuePage> for IssuePageResponse {
    fn from(page: IssuePage) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub order: i64,
}

impl From<PostCategory> for CategoryResponse {
    fn from(category: PostCategory) -> Self {
        Self {
            id: category.id,
            name: category.name,
            order: category.order,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PostResponse {
    pub id: i64,
    pub issue_id: Option<i64>,
    pub category_id: Option<i64>,
    pub title: String,
    pub source_url: String,
    pub short_description: String,
    pub is_visible: bool,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            issue_id: post.issue_id,
            category_id: post.category_id,
            title: post.title,
            source_url: post.source_url,
            short_description: post.short_description,
            is_visible: post.is_visible,
            order: post.order,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SectionResponse {
    pub category: Option<CategoryResponse>,
    pub posts: Vec<PostResponse>,
}

impl From<IssueSection> for SectionResponse {
    fn from(section: IssueSection) -> Self {
        Self {
            category: section.category.map(Into::into),
            posts: section.posts.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IssueDetailResponse {
    pub issue: IssueResponse,
    pub sections: Vec<SectionResponse>,
}

impl From<IssueDetail> for IssueDetailResponse {
    fn from(detail: IssueDetail) -> Self {
        Self {
            issue: detail.issue.into(),
            sections: detail.sections.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NewsletterResponse {
    pub id: i64,
    pub issue_id: i64,
    pub subject: String,
    pub schedule: Option<DateTime<Utc>>,
    pub is_sent: bool,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Newsletter> for NewsletterResponse {
    fn from(newsletter: Newsletter) -> Self {
        Self {
            id: newsletter.id,
            issue_id: newsletter.issue_id,
            subject: newsletter.subject,
            schedule: newsletter.schedule,
            is_sent: newsletter.is_sent,
            sent_at: newsletter.sent_at,
            created_at: newsletter.created_at,
            updated_at: newsletter.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchFailureResponse {
    pub newsletter_id: i64,
    pub reason: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DispatchReportResponse {
    pub sent: Vec<i64>,
    pub skipped: Vec<i64>,
    pub failed: Vec<DispatchFailureResponse>,
    pub deliveries: usize,
}

impl From<DispatchReport> for DispatchReportResponse {
    fn from(report: DispatchReport) -> Self {
        Self {
            sent: report.sent,
            skipped: report.skipped,
            failed: report
                .failed
                .into_iter()
                .map(|f| DispatchFailureResponse {
                    newsletter_id: f.newsletter_id,
                    reason: f.reason,
                })
                .collect(),
            deliveries: report.deliveries,
        }
    }
}

/// Public view of a subscriber. The token is never returned.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriberResponse {
    pub id: i64,
    pub email_address: String,
    pub verified: bool,
    pub subscribed: bool,
    /// `unverified`, `verification_pending`, `subscribed` or `unsubscribed`
    pub state: String,
    pub verification_sent_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_expired: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<Subscriber> for SubscriberResponse {
    fn from(subscriber: Subscriber) -> Self {
        Self {
            id: subscriber.id,
            state: subscriber.state().as_str().to_string(),
            email_address: subscriber.email_address,
            verified: subscriber.verified,
            subscribed: subscriber.subscribed,
            verification_sent_date: subscriber.verification_sent_date,
            token_expired: None,
            created_at: subscriber.created_at,
        }
    }
}

impl From<SubscriberSummary> for SubscriberResponse {
    fn from(summary: SubscriberSummary) -> Self {
        Self {
            token_expired: Some(summary.token_expired),
            ..SubscriberResponse::from(summary.subscriber)
        }
    }
}

/// Selection for bulk actions.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkIdsRequest {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkUpdateResponse {
    pub requested: usize,
    pub updated: u64,
}
