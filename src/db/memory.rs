use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Account, AccountRecord, Comment, Post, ProfileChanges};
use crate::db::{AccountStore, PostStore};
use crate::error::DatabaseError;

/// In-process store. Each write holds the map's lock for its whole
/// check-and-insert, so uniqueness holds under concurrent registrations.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, AccountRecord>>,
    posts: RwLock<HashMap<Uuid, Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, record: &AccountRecord) -> Result<Account, DatabaseError> {
        let mut accounts = self.accounts.write().await;

        for existing in accounts.values() {
            if existing.account.email == record.account.email {
                return Err(DatabaseError::Duplicate("email".to_string()));
            }
            if existing.account.username == record.account.username {
                return Err(DatabaseError::Duplicate("username".to_string()));
            }
        }

        accounts.insert(record.account.id, record.clone());
        Ok(record.account.clone())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, DatabaseError> {
        Ok(self
            .accounts
            .read()
            .await
            .get(&id)
            .map(|record| record.account.clone()))
    }

    async fn find_record_by_email(&self, email: &str) -> Result<Option<AccountRecord>, DatabaseError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .find(|record| record.account.email == email)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .accounts
            .read()
            .await
            .values()
            .any(|record| record.account.username == username))
    }

    async fn find_accounts_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Account>, DatabaseError> {
        let accounts = self.accounts.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| accounts.get(id))
            .map(|record| record.account.clone())
            .collect())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<Account>, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|record| {
            changes.apply(&mut record.account);
            record.account.clone()
        }))
    }

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> Result<Option<Account>, DatabaseError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts.get_mut(&id).map(|record| {
            record.account.profile_picture = url.to_string();
            record.account.updated_at = Utc::now();
            record.account.clone()
        }))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: &Post) -> Result<Post, DatabaseError> {
        self.posts.write().await.insert(post.id, post.clone());
        Ok(post.clone())
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<Post>, DatabaseError> {
        Ok(self.posts.read().await.get(&id).cloned())
    }

    async fn list_posts(&self) -> Result<Vec<Post>, DatabaseError> {
        let mut posts: Vec<Post> = self.posts.read().await.values().cloned().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn toggle_like(&self, post_id: Uuid, account_id: Uuid) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&post_id).map(|post| {
            post.toggle_like(account_id);
            post.clone()
        }))
    }

    async fn add_comment(&self, post_id: Uuid, comment: &Comment) -> Result<Option<Post>, DatabaseError> {
        let mut posts = self.posts.write().await;
        Ok(posts.get_mut(&post_id).map(|post| {
            post.add_comment(comment.clone());
            post.clone()
        }))
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool, DatabaseError> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }
}
