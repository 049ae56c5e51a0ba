//! Newsletter scheduling and dispatch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use newsdesk_config::NewsletterConfig;
use newsdesk_database::{
    CreateNewsletterRequest, IssueRepository, Newsletter, NewsletterRepository, PostRepository,
    SubscriberRepository,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{NewsfeedError, NewsfeedResult};
use crate::mailer::{unsubscribe_link, Mailer, OutgoingEmail};
use crate::services::issue_service::{group_sections, IssueDetail};
use crate::validation::{require_text, MAX_SUBJECT};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    Sent { recipients: usize },
    AlreadySent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchFailure {
    pub newsletter_id: i64,
    pub reason: String,
}

/// Result of a bulk send.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub sent: Vec<i64>,
    pub skipped: Vec<i64>,
    pub failed: Vec<DispatchFailure>,
    pub deliveries: usize,
}

#[derive(Clone)]
pub struct NewsletterService {
    newsletters: NewsletterRepository,
    issues: IssueRepository,
    posts: PostRepository,
    subscribers: SubscriberRepository,
    mailer: Arc<dyn Mailer>,
    settings: NewsletterConfig,
}

impl NewsletterService {
    pub fn new(
        newsletters: NewsletterRepository,
        issues: IssueRepository,
        posts: PostRepository,
        subscribers: SubscriberRepository,
        mailer: Arc<dyn Mailer>,
        settings: NewsletterConfig,
    ) -> Self {
        Self {
            newsletters,
            issues,
            posts,
            subscribers,
            mailer,
            settings,
        }
    }

    pub async fn get(&self, id: i64) -> NewsfeedResult<Newsletter> {
        self.newsletters
            .find_by_id(id)
            .await?
            .ok_or_else(|| NewsfeedError::not_found(format!("newsletter {id}")))
    }

    pub async fn list(
        &self,
        is_sent: Option<bool>,
        issue_id: Option<i64>,
    ) -> NewsfeedResult<Vec<Newsletter>> {
        Ok(self.newsletters.list(is_sent, issue_id).await?)
    }

    pub async fn create(&self, mut request: CreateNewsletterRequest) -> NewsfeedResult<Newsletter> {
        request.subject = require_text("subject", &request.subject, MAX_SUBJECT)?;
        if self.issues.find_by_id(request.issue_id).await?.is_none() {
            return Err(NewsfeedError::validation(format!(
                "issue {} does not exist",
                request.issue_id
            )));
        }

        let newsletter = self.newsletters.create(&request).await?;
        info!(newsletter_id = newsletter.id, schedule = ?newsletter.schedule, "newsletter scheduled");
        Ok(newsletter)
    }

    pub async fn delete(&self, id: i64) -> NewsfeedResult<()> {
        if !self.newsletters.delete(id).await? {
            return Err(NewsfeedError::not_found(format!("newsletter {id}")));
        }
        Ok(())
    }

    /// Deliver one newsletter to every active subscriber.
    pub async fn send_newsletter(&self, id: i64) -> NewsfeedResult<DispatchOutcome> {
        let newsletter = self.get(id).await?;
        self.dispatch(&newsletter, Utc::now()).await
    }

    /// Bulk send. Failures are collected per newsletter instead of aborting the batch.
    pub async fn send(&self, ids: &[i64]) -> NewsfeedResult<DispatchReport> {
        let now = Utc::now();
        let mut report = DispatchReport::default();
        for &id in ids {
            let outcome = match self.newsletters.find_by_id(id).await? {
                Some(newsletter) => self.dispatch(&newsletter, now).await,
                None => Err(NewsfeedError::not_found(format!("newsletter {id}"))),
            };
            record(&mut report, id, outcome)?;
        }
        Ok(report)
    }

    /// Send every unsent newsletter scheduled at or before `now`.
    pub async fn send_due(&self, now: DateTime<Utc>) -> NewsfeedResult<DispatchReport> {
        let due = self.newsletters.list_due(now).await?;
        let mut report = DispatchReport::default();
        for newsletter in &due {
            let outcome = self.dispatch(newsletter, now).await;
            record(&mut report, newsletter.id, outcome)?;
        }
        info!(
            due = due.len(),
            sent = report.sent.len(),
            failed = report.failed.len(),
            "due newsletters processed"
        );
        Ok(report)
    }

    async fn dispatch(
        &self,
        newsletter: &Newsletter,
        now: DateTime<Utc>,
    ) -> NewsfeedResult<DispatchOutcome> {
        if newsletter.is_sent {
            return Ok(DispatchOutcome::AlreadySent);
        }

        let issue = self
            .issues
            .find_by_id(newsletter.issue_id)
            .await?
            .ok_or_else(|| NewsfeedError::not_found(format!("issue {}", newsletter.issue_id)))?;
        if !issue.is_published(now) {
            warn!(newsletter_id = newsletter.id, issue_id = issue.id, "issue not released");
            return Err(NewsfeedError::IssueNotReleased(issue.issue_number));
        }

        let sections = group_sections(self.posts.visible_for_issue(issue.id).await?);
        let body = render_body(
            &IssueDetail { issue, sections },
            &unsubscribe_link(&self.settings.site_url),
        );

        let batch_size = self.settings.batch_size.max(1) as i64;
        let mut recipients = 0;
        let mut after_id = 0;
        loop {
            let batch = self
                .subscribers
                .list_active_after(after_id, batch_size)
                .await?;
            let Some(last) = batch.last() else {
                break;
            };
            after_id = last.id;

            for subscriber in &batch {
                self.mailer
                    .send(OutgoingEmail {
                        from: self.settings.from_address.clone(),
                        to: subscriber.email_address.clone(),
                        subject: newsletter.subject.clone(),
                        body: body.clone(),
                    })
                    .await?;
            }
            recipients += batch.len();
        }

        if !self.newsletters.mark_sent(newsletter.id, now).await? {
            warn!(newsletter_id = newsletter.id, "newsletter was marked sent concurrently");
        }
        info!(newsletter_id = newsletter.id, recipients, "newsletter sent");
        Ok(DispatchOutcome::Sent { recipients })
    }
}

fn record(
    report: &mut DispatchReport,
    id: i64,
    outcome: NewsfeedResult<DispatchOutcome>,
) -> NewsfeedResult<()> {
    match outcome {
        Ok(DispatchOutcome::Sent { recipients }) => {
            report.sent.push(id);
            report.deliveries += recipients;
        }
        Ok(DispatchOutcome::AlreadySent) => report.skipped.push(id),
        Err(NewsfeedError::Database(err)) => {
            error!(newsletter_id = id, error = %err, "newsletter dispatch aborted");
            return Err(NewsfeedError::Database(err));
        }
        Err(err) => {
            warn!(newsletter_id = id, error = %err, "newsletter not sent");
            report.failed.push(DispatchFailure {
                newsletter_id: id,
                reason: err.to_string(),
            });
        }
    }
    Ok(())
}

/// Plain-text rendering of an issue for email.
pub fn render_body(detail: &IssueDetail, unsubscribe_url: &str) -> String {
    let issue = &detail.issue;
    let mut body = format!("{} (#{})\n", issue.title, issue.issue_number);
    if let Some(description) = &issue.short_description {
        body.push('\n');
        body.push_str(description);
        body.push('\n');
    }

    for section in &detail.sections {
        let heading = section
            .category
            .as_ref()
            .map_or("Other", |c| c.name.as_str());
        body.push_str(&format!("\n== {heading} ==\n"));
        for post in &section.posts {
            body.push_str(&format!("\n- {}\n  {}\n", post.title, post.source_url));
            if !post.short_description.is_empty() {
                body.push_str(&format!("  {}\n", post.short_description));
            }
        }
    }

    body.push_str(&format!(
        "\n--\nYou receive this email because you subscribed to our newsletter.\n\
         Unsubscribe: {unsubscribe_url}\n"
    ));
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::issue_service::IssueSection;
    use newsdesk_database::{Issue, IssueType, Post, PostCategory};

    fn detail() -> IssueDetail {
        let now = Utc::now();
        let post = |id: i64, title: &str, description: &str| Post {
            id,
            issue_id: Some(1),
            category_id: None,
            title: title.to_string(),
            source_url: format!("https://example.com/{id}"),
            short_description: description.to_string(),
            is_visible: true,
            order: 0,
            created_at: now,
            updated_at: now,
        };

        IssueDetail {
            issue: Issue {
                id: 1,
                title: "This Week in Tooling".to_string(),
                issue_number: 42,
                publish_date: now,
                issue_type: IssueType::Weekly,
                short_description: Some("Fresh links".to_string()),
                is_draft: false,
                created_at: now,
                updated_at: now,
            },
            sections: vec![
                IssueSection {
                    category: Some(PostCategory {
                        id: 1,
                        name: "Articles".to_string(),
                        order: 0,
                    }),
                    posts: vec![post(1, "Async drops", "A long read")],
                },
                IssueSection {
                    category: None,
                    posts: vec![post(2, "Misc", "")],
                },
            ],
        }
    }

    #[test]
    fn body_lists_sections_and_unsubscribe_link() {
        let body = render_body(&detail(), "https://news.example.com/api/unsubscribe");

        assert!(body.starts_with("This Week in Tooling (#42)\n"));
        assert!(body.contains("== Articles =="));
        assert!(body.contains("- Async drops\n  https://example.com/1\n  A long read\n"));
        assert!(body.contains("== Other =="));
        assert!(body.ends_with("Unsubscribe: https://news.example.com/api/unsubscribe\n"));
        assert!(body.find("Articles") < body.find("Other"));
    }

    #[test]
    fn failures_are_recorded_but_database_errors_abort() {
        let mut report = DispatchReport::default();
        record(&mut report, 1, Ok(DispatchOutcome::Sent { recipients: 3 })).unwrap();
        record(&mut report, 2, Ok(DispatchOutcome::AlreadySent)).unwrap();
        record(&mut report, 3, Err(NewsfeedError::IssueNotReleased(9))).unwrap();

        assert_eq!(report.sent, vec![1]);
        assert_eq!(report.skipped, vec![2]);
        assert_eq!(report.deliveries, 3);
        assert_eq!(report.failed[0].newsletter_id, 3);

        let aborted = record(
            &mut report,
            4,
            Err(NewsfeedError::Database(
                newsdesk_database::DatabaseError::QueryError("disk full".into()),
            )),
        );
        assert!(aborted.is_err());
    }
}
