//! Persistence layer for accounts and posts.
//!
//! Handlers and services only see the [`AccountStore`] and [`PostStore`]
//! traits. [`DbOperations`] backs them with Postgres, [`MemoryStore`] keeps
//! everything in process for tests and local runs.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::MemoryStore;
pub use models::{
    Account, AccountRecord, AccountSummary, Comment, CommentView, FeedPost, Post, ProfileChanges,
};
pub use operations::{DbOperations, DbPoolStatus};

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts a new account. Fails with `DatabaseError::Duplicate("email")`
    /// or `Duplicate("username")` when a unique field is taken.
    async fn create_account(&self, record: &AccountRecord) -> Result<Account, DatabaseError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError>;

    async fn find_record_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DatabaseError>;

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError>;

    /// Accounts for the given ids, in no particular order. Unknown ids are skipped.
    async fn find_accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, DatabaseError>;

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<Account>, DatabaseError>;

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> Result<Option<Account>, DatabaseError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<Post, DatabaseError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError>;

    /// All posts, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, DatabaseError>;

    /// Adds or removes `account_id` from the post's likes in one write.
    async fn toggle_like(&self, post_id: Uuid, account_id: Uuid) -> Result<Option<Post>, DatabaseError>;

    async fn add_comment(&self, post_id: Uuid, comment: &Comment) -> Result<Option<Post>, DatabaseError>;

    /// Returns false when no post had that id.
    async fn delete_post(&self, id: Uuid) -> Result<bool, DatabaseError>;
}
