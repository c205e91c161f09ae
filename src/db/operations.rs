use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::{Account, AccountRecord, Comment, Post, ProfileChanges};
use crate::db::{AccountStore, PostStore};
use crate::error::DatabaseError;

const ACCOUNT_COLUMNS: &str = "id, name, username, email, profile_picture, banner_img, \
     headline, location, about, skills, created_at, updated_at";

const POST_COLUMNS: &str =
    "id, author_id, content, image, image_id, likes, comments, created_at, updated_at";

/// Postgres-backed store. Expects the tables described in `schema.sql`.
pub struct DbOperations {
    pool: Arc<PgPool>,
}

impl DbOperations {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub fn get_pool_status(&self) -> DbPoolStatus {
        let size = self.pool.size();
        let idle = self.pool.num_idle() as u32;

        DbPoolStatus {
            total_connections: size,
            active_connections: size.saturating_sub(idle),
            idle_connections: idle,
        }
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[derive(Debug, Clone)]
pub struct DbPoolStatus {
    pub total_connections: u32,
    pub active_connections: u32,
    pub idle_connections: u32,
}

fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
    let comments: Json<Vec<Comment>> = row.try_get("comments")?;
    Ok(Post {
        id: row.try_get("id")?,
        author_id: row.try_get("author_id")?,
        content: row.try_get("content")?,
        image: row.try_get("image")?,
        image_id: row.try_get("image_id")?,
        likes: row.try_get("likes")?,
        comments: comments.0,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AccountStore for DbOperations {
    async fn create_account(&self, record: &AccountRecord) -> Result<Account, DatabaseError> {
        let account = &record.account;
        let created = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO users (id, name, username, email, password_hash, profile_picture,
                               banner_img, headline, location, about, skills, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&record.password_hash)
        .bind(&account.profile_picture)
        .bind(&account.banner_img)
        .bind(&account.headline)
        .bind(&account.location)
        .bind(&account.about)
        .bind(&account.skills)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(created)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }

    async fn find_record_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {}, password_hash FROM users WHERE email = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(record)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(exists)
    }

    async fn find_accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM users WHERE id = ANY($1)",
            ACCOUNT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(accounts)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                headline = COALESCE($3, headline),
                location = COALESCE($4, location),
                about = COALESCE($5, about),
                banner_img = COALESCE($6, banner_img),
                skills = COALESCE($7, skills),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.headline)
        .bind(&changes.location)
        .bind(&changes.about)
        .bind(&changes.banner_img)
        .bind(&changes.skills)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> Result<Option<Account>, DatabaseError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "UPDATE users SET profile_picture = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }
}

#[async_trait]
impl PostStore for DbOperations {
    async fn create_post(&self, post: &Post) -> Result<Post, DatabaseError> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO posts (id, author_id, content, image, image_id, likes, comments,
                               created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post.id)
        .bind(post.author_id)
        .bind(&post.content)
        .bind(&post.image)
        .bind(&post.image_id)
        .bind(&post.likes)
        .bind(Json(&post.comments))
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(post_from_row(&row)?)
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = $1", POST_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn list_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM posts ORDER BY created_at DESC",
            POST_COLUMNS
        ))
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(post_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    async fn toggle_like(&self, post_id: Uuid, account_id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE posts SET
                likes = CASE WHEN $2 = ANY(likes)
                             THEN array_remove(likes, $2)
                             ELSE array_append(likes, $2) END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(account_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn add_comment(&self, post_id: Uuid, comment: &Comment) -> Result<Option<Post>, DatabaseError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE posts SET comments = comments || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            POST_COLUMNS
        ))
        .bind(post_id)
        .bind(Json(vec![comment]))
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
