//! Issue publishing: release filter, public lookups and admin management.

use chrono::Utc;
use newsdesk_database::{
    CategorizedPost, CreateIssueRequest, Issue, IssueFilter, IssueRepository, Post, PostCategory,
    PostRepository, UpdateIssueRequest,
};
use serde::Serialize;
use tracing::info;

use crate::error::{NewsfeedError, NewsfeedResult};
use crate::validation::{require_text, MAX_ISSUE_TITLE};

/// One page of released issues.
#[derive(Debug, Clone, Serialize)]
pub struct IssuePage {
    pub items: Vec<Issue>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
    pub total_pages: u32,
}

/// Visible posts of an issue that share a category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSection {
    pub category: Option<PostCategory>,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueDetail {
    pub issue: Issue,
    pub sections: Vec<IssueSection>,
}

/// Fold consecutive posts of the same category into sections.
/// Input must already be in category order.
pub fn group_sections(posts: Vec<CategorizedPost>) -> Vec<IssueSection> {
    let mut sections: Vec<IssueSection> = Vec::new();
    for CategorizedPost { post, category } in posts {
        let category_id = category.as_ref().map(|c| c.id);
        match sections.last_mut() {
            Some(section) if section.category.as_ref().map(|c| c.id) == category_id => {
                section.posts.push(post);
            }
            _ => sections.push(IssueSection {
                category,
                posts: vec![post],
            }),
        }
    }
    sections
}

#[derive(Clone)]
pub struct IssueService {
    issues: IssueRepository,
    posts: PostRepository,
    per_page: u32,
}

impl IssueService {
    pub fn new(issues: IssueRepository, posts: PostRepository, per_page: u32) -> Self {
        Self {
            issues,
            posts,
            per_page: per_page.max(1),
        }
    }

    /// Released issues, newest first. Pages start at 1; 0 is treated as 1.
    pub async fn list_released(&self, page: u32) -> NewsfeedResult<IssuePage> {
        let now = Utc::now();
        let page = page.max(1);
        let per_page = self.per_page;
        let offset = i64::from(page - 1) * i64::from(per_page);

        let total = self.issues.count_released(now).await?;
        let items = self
            .issues
            .list_released(now, i64::from(per_page), offset)
            .await?;
        let total_pages = u32::try_from((total + i64::from(per_page) - 1) / i64::from(per_page))
            .unwrap_or(u32::MAX);

        Ok(IssuePage {
            items,
            page,
            per_page,
            total,
            total_pages,
        })
    }

    /// Drafts and issues whose publish date is still ahead.
    pub async fn list_drafts(&self) -> NewsfeedResult<Vec<Issue>> {
        Ok(self.issues.list_unreleased(Utc::now()).await?)
    }

    pub async fn latest_released(&self) -> NewsfeedResult<IssueDetail> {
        let issue = self
            .issues
            .latest_released(Utc::now())
            .await?
            .ok_or_else(|| NewsfeedError::not_found("released issue"))?;
        self.detail(issue).await
    }

    /// Public detail lookup. Drafts and future issues are reported as missing.
    pub async fn released_detail(&self, issue_number: i64) -> NewsfeedResult<IssueDetail> {
        let issue = self
            .issues
            .find_released_by_number(issue_number, Utc::now())
            .await?
            .ok_or_else(|| NewsfeedError::not_found(format!("issue #{issue_number}")))?;
        self.detail(issue).await
    }

    /// Detail of any issue, released or not.
    pub async fn detail(&self, issue: Issue) -> NewsfeedResult<IssueDetail> {
        let posts = self.posts.visible_for_issue(issue.id).await?;
        Ok(IssueDetail {
            issue,
            sections: group_sections(posts),
        })
    }

    pub async fn get(&self, id: i64) -> NewsfeedResult<Issue> {
        self.issues
            .find_by_id(id)
            .await?
            .ok_or_else(|| NewsfeedError::not_found(format!("issue {id}")))
    }

    pub async fn list(&self, filter: &IssueFilter) -> NewsfeedResult<Vec<Issue>> {
        Ok(self.issues.list(filter).await?)
    }

    /// Search by title, description or exact issue number.
    pub async fn search(&self, query: &str) -> NewsfeedResult<Vec<Issue>> {
        self.list(&IssueFilter {
            search: Some(query.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn create(&self, mut request: CreateIssueRequest) -> NewsfeedResult<Issue> {
        request.title = require_text("title", &request.title, MAX_ISSUE_TITLE)?;
        validate_issue_number(request.issue_number)?;
        request.short_description = normalize_description(request.short_description);

        let issue = self.issues.create(&request).await?;
        info!(issue_id = issue.id, issue_number = issue.issue_number, "issue added");
        Ok(issue)
    }

    pub async fn update(&self, id: i64, mut request: UpdateIssueRequest) -> NewsfeedResult<Issue> {
        if let Some(title) = &request.title {
            request.title = Some(require_text("title", title, MAX_ISSUE_TITLE)?);
        }
        if let Some(issue_number) = request.issue_number {
            validate_issue_number(issue_number)?;
        }
        request.short_description = request.short_description.map(normalize_description);
        Ok(self.issues.update(id, &request).await?)
    }

    pub async fn delete(&self, id: i64) -> NewsfeedResult<()> {
        if !self.issues.delete(id).await? {
            return Err(NewsfeedError::not_found(format!("issue {id}")));
        }
        info!(issue_id = id, "issue deleted");
        Ok(())
    }

    /// Take issues out of draft. Returns the number of issues updated.
    pub async fn publish(&self, ids: &[i64]) -> NewsfeedResult<u64> {
        let updated = self.issues.set_draft(ids, false).await?;
        info!(requested = ids.len(), updated, "issues published");
        Ok(updated)
    }

    pub async fn mark_draft(&self, ids: &[i64]) -> NewsfeedResult<u64> {
        let updated = self.issues.set_draft(ids, true).await?;
        info!(requested = ids.len(), updated, "issues moved to draft");
        Ok(updated)
    }
}

fn validate_issue_number(issue_number: i64) -> NewsfeedResult<()> {
    if issue_number <= 0 {
        return Err(NewsfeedError::validation("issue_number must be positive"));
    }
    Ok(())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}
