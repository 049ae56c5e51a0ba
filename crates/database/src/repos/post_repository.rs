//! Repository for posts and their categories.

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::info;

use crate::entities::{
    CategorizedPost, CreateCategoryRequest, CreatePostRequest, Post, PostCategory, PostFilter,
    UpdateCategoryRequest, UpdatePostRequest,
};
use crate::types::{format_timestamp, parse_timestamp, DatabaseError, DatabaseResult};

const POST_COLUMNS: &str = r#"p.id, p.issue_id, p.category_id, p.title, p.source_url, p.short_description, p.is_visible, p."order", p.created_at, p.updated_at"#;

/// Repository for post database operations
#[derive(Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreatePostRequest) -> DatabaseResult<Post> {
        let now = format_timestamp(Utc::now());

        let result = sqlx::query(
            r#"INSERT INTO posts (issue_id, category_id, title, source_url, short_description, is_visible, "order", created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(request.issue_id)
        .bind(request.category_id)
        .bind(&request.title)
        .bind(&request.source_url)
        .bind(&request.short_description)
        .bind(request.is_visible)
        .bind(request.order)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let post_id = result.last_insert_rowid();
        info!(post_id, issue_id = ?request.issue_id, "post created");

        self.find_by_id(post_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("post {post_id}")))
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_post).transpose()
    }

    /// Admin listing, newest first.
    pub async fn list(&self, filter: &PostFilter) -> DatabaseResult<Vec<Post>> {
        let mut query =
            QueryBuilder::<Sqlite>::new(format!("SELECT {POST_COLUMNS} FROM posts p WHERE 1 = 1"));

        if let Some(issue_id) = filter.issue_id {
            query.push(" AND p.issue_id = ").push_bind(issue_id);
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND p.category_id = ").push_bind(category_id);
        }
        if let Some(is_visible) = filter.is_visible {
            query.push(" AND p.is_visible = ").push_bind(is_visible);
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{search}%");
            query
                .push(" AND (p.title LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.source_url LIKE ")
                .push_bind(pattern.clone())
                .push(" OR p.short_description LIKE ")
                .push_bind(pattern)
                .push(")");
        }

        query.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_post).collect()
    }

    /// Visible posts of one issue, grouped by category order then post order.
    /// Uncategorised posts come last.
    pub async fn visible_for_issue(&self, issue_id: i64) -> DatabaseResult<Vec<CategorizedPost>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {POST_COLUMNS}, c.name AS category_name, c."order" AS category_order
               FROM posts p
               LEFT JOIN post_categories c ON c.id = p.category_id
               WHERE p.issue_id = ? AND p.is_visible = true
               ORDER BY c.id IS NULL, c."order", c.name, p."order", p.id"#
        ))
        .bind(issue_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let post = map_post(row)?;
                let category = match post.category_id {
                    Some(id) => Some(PostCategory {
                        id,
                        name: row.try_get("category_name")?,
                        order: row.try_get("category_order")?,
                    }),
                    None => None,
                };
                Ok(CategorizedPost { post, category })
            })
            .collect()
    }

    pub async fn update(&self, id: i64, request: &UpdatePostRequest) -> DatabaseResult<Post> {
        let mut post = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))?;

        if let Some(issue_id) = request.issue_id {
            post.issue_id = issue_id;
        }
        if let Some(category_id) = request.category_id {
            post.category_id = category_id;
        }
        if let Some(title) = &request.title {
            post.title = title.clone();
        }
        if let Some(source_url) = &request.source_url {
            post.source_url = source_url.clone();
        }
        if let Some(description) = &request.short_description {
            post.short_description = description.clone();
        }
        if let Some(is_visible) = request.is_visible {
            post.is_visible = is_visible;
        }
        if let Some(order) = request.order {
            post.order = order;
        }

        sqlx::query(
            r#"UPDATE posts SET issue_id = ?, category_id = ?, title = ?, source_url = ?,
                   short_description = ?, is_visible = ?, "order" = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(post.issue_id)
        .bind(post.category_id)
        .bind(&post.title)
        .bind(&post.source_url)
        .bind(&post.short_description)
        .bind(post.is_visible)
        .bind(post.order)
        .bind(format_timestamp(Utc::now()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("post {id}")))
    }

    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bulk hide/show. Returns the number of rows touched.
    pub async fn set_visibility(&self, ids: &[i64], is_visible: bool) -> DatabaseResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE posts SET is_visible = ");
        query
            .push_bind(is_visible)
            .push(", updated_at = ")
            .push_bind(format_timestamp(Utc::now()))
            .push(" WHERE id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let result = query.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

/// Repository for post category database operations
#[derive(Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, request: &CreateCategoryRequest) -> DatabaseResult<PostCategory> {
        let result = sqlx::query(r#"INSERT INTO post_categories (name, "order") VALUES (?, ?)"#)
            .bind(&request.name)
            .bind(request.order)
            .execute(&self.pool)
            .await?;

        Ok(PostCategory {
            id: result.last_insert_rowid(),
            name: request.name.clone(),
            order: request.order,
        })
    }

    pub async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<PostCategory>> {
        let row = sqlx::query(r#"SELECT id, name, "order" FROM post_categories WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_category).transpose()
    }

    pub async fn list(&self, search: Option<&str>) -> DatabaseResult<Vec<PostCategory>> {
        let mut query =
            QueryBuilder::<Sqlite>::new(r#"SELECT id, name, "order" FROM post_categories"#);
        if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(" WHERE name LIKE ").push_bind(format!("%{search}%"));
        }
        query.push(r#" ORDER BY "order", name"#);

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(map_category).collect()
    }

    pub async fn update(
        &self,
        id: i64,
        request: &UpdateCategoryRequest,
    ) -> DatabaseResult<PostCategory> {
        let mut category = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("category {id}")))?;

        if let Some(name) = &request.name {
            category.name = name.clone();
        }
        if let Some(order) = request.order {
            category.order = order;
        }

        sqlx::query(r#"UPDATE post_categories SET name = ?, "order" = ? WHERE id = ?"#)
            .bind(&category.name)
            .bind(category.order)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(category)
    }

    /// Delete a category. Posts in it become uncategorised.
    pub async fn delete(&self, id: i64) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM post_categories WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_post(row: &SqliteRow) -> DatabaseResult<Post> {
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(Post {
        id: row.try_get("id")?,
        issue_id: row.try_get("issue_id")?,
        category_id: row.try_get("category_id")?,
        title: row.try_get("title")?,
        source_url: row.try_get("source_url")?,
        short_description: row.try_get("short_description")?,
        is_visible: row.try_get("is_visible")?,
        order: row.try_get("order")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn map_category(row: &SqliteRow) -> DatabaseResult<PostCategory> {
    Ok(PostCategory {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        order: row.try_get("order")?,
    })
}
