//! Posts and their categories.

use newsdesk_database::{
    CategoryRepository, CreateCategoryRequest, CreatePostRequest, IssueRepository, Post,
    PostCategory, PostFilter, PostRepository, UpdateCategoryRequest, UpdatePostRequest,
};
use tracing::info;

use crate::error::{NewsfeedError, NewsfeedResult};
use crate::validation::{require_text, require_url, MAX_CATEGORY_NAME, MAX_POST_TITLE};

#[derive(Clone)]
pub struct PostService {
    posts: PostRepository,
    categories: CategoryRepository,
    issues: IssueRepository,
}

impl PostService {
    pub fn new(
        posts: PostRepository,
        categories: CategoryRepository,
        issues: IssueRepository,
    ) -> Self {
        Self {
            posts,
            categories,
            issues,
        }
    }

    pub async fn get(&self, id: i64) -> NewsfeedResult<Post> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| NewsfeedError::not_found(format!("post {id}")))
    }

    pub async fn list(&self, filter: &PostFilter) -> NewsfeedResult<Vec<Post>> {
        Ok(self.posts.list(filter).await?)
    }

    pub async fn visible(&self) -> NewsfeedResult<Vec<Post>> {
        self.list(&PostFilter {
            is_visible: Some(true),
            ..Default::default()
        })
        .await
    }

    pub async fn hidden(&self) -> NewsfeedResult<Vec<Post>> {
        self.list(&PostFilter {
            is_visible: Some(false),
            ..Default::default()
        })
        .await
    }

    pub async fn create(&self, mut request: CreatePostRequest) -> NewsfeedResult<Post> {
        request.title = require_text("title", &request.title, MAX_POST_TITLE)?;
        request.source_url = require_url("source_url", &request.source_url)?;
        request.short_description = request.short_description.trim().to_string();
        self.check_references(request.issue_id, request.category_id)
            .await?;

        let post = self.posts.create(&request).await?;
        info!(post_id = post.id, "post added");
        Ok(post)
    }

    pub async fn update(&self, id: i64, mut request: UpdatePostRequest) -> NewsfeedResult<Post> {
        if let Some(title) = &request.title {
            request.title = Some(require_text("title", title, MAX_POST_TITLE)?);
        }
        if let Some(url) = &request.source_url {
            request.source_url = Some(require_url("source_url", url)?);
        }
        if let Some(description) = &request.short_description {
            request.short_description = Some(description.trim().to_string());
        }
        self.check_references(request.issue_id.flatten(), request.category_id.flatten())
            .await?;

        Ok(self.posts.update(id, &request).await?)
    }

    pub async fn delete(&self, id: i64) -> NewsfeedResult<()> {
        if !self.posts.delete(id).await? {
            return Err(NewsfeedError::not_found(format!("post {id}")));
        }
        Ok(())
    }

    /// Returns the number of posts hidden.
    pub async fn hide(&self, ids: &[i64]) -> NewsfeedResult<u64> {
        let updated = self.posts.set_visibility(ids, false).await?;
        info!(requested = ids.len(), updated, "posts hidden");
        Ok(updated)
    }

    pub async fn make_visible(&self, ids: &[i64]) -> NewsfeedResult<u64> {
        let updated = self.posts.set_visibility(ids, true).await?;
        info!(requested = ids.len(), updated, "posts made visible");
        Ok(updated)
    }

    pub async fn get_category(&self, id: i64) -> NewsfeedResult<PostCategory> {
        self.categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| NewsfeedError::not_found(format!("category {id}")))
    }

    pub async fn list_categories(&self, search: Option<&str>) -> NewsfeedResult<Vec<PostCategory>> {
        Ok(self.categories.list(search).await?)
    }

    pub async fn create_category(
        &self,
        mut request: CreateCategoryRequest,
    ) -> NewsfeedResult<PostCategory> {
        request.name = require_text("name", &request.name, MAX_CATEGORY_NAME)?;
        Ok(self.categories.create(&request).await?)
    }

    pub async fn update_category(
        &self,
        id: i64,
        mut request: UpdateCategoryRequest,
    ) -> NewsfeedResult<PostCategory> {
        if let Some(name) = &request.name {
            request.name = Some(require_text("name", name, MAX_CATEGORY_NAME)?);
        }
        Ok(self.categories.update(id, &request).await?)
    }

    /// Posts of a deleted category become uncategorised.
    pub async fn delete_category(&self, id: i64) -> NewsfeedResult<()> {
        if !self.categories.delete(id).await? {
            return Err(NewsfeedError::not_found(format!("category {id}")));
        }
        Ok(())
    }

    async fn check_references(
        &self,
        issue_id: Option<i64>,
        category_id: Option<i64>,
    ) -> NewsfeedResult<()> {
        if let Some(issue_id) = issue_id {
            if self.issues.find_by_id(issue_id).await?.is_none() {
                return Err(NewsfeedError::validation(format!(
                    "issue {issue_id} does not exist"
                )));
            }
        }
        if let Some(category_id) = category_id {
            if self.categories.find_by_id(category_id).await?.is_none() {
                return Err(NewsfeedError::validation(format!(
                    "category {category_id} does not exist"
                )));
            }
        }
        Ok(())
    }
}
