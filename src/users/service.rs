use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::db::{Account, AccountStore, ProfileChanges};
use crate::error::AppError;
use crate::media::MediaHost;
use crate::Result;

/// Profile reads and updates. The acting account is always the verified
/// session account handed in by the caller.
pub struct ProfileService {
    accounts: Arc<dyn AccountStore>,
    media: Arc<dyn MediaHost>,
}

impl ProfileService {
    pub fn new(accounts: Arc<dyn AccountStore>, media: Arc<dyn MediaHost>) -> Self {
        Self { accounts, media }
    }

    pub async fn get_account(&self, id: Uuid) -> Result<Account> {
        self.accounts
            .find_account_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    pub async fn update_profile(&self, actor: &Account, changes: ProfileChanges) -> Result<Account> {
        if matches!(&changes.name, Some(name) if name.trim().is_empty()) {
            return Err(AppError::ValidationError("name cannot be empty".to_string()));
        }

        self.accounts
            .update_profile(actor.id, &changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    /// Uploads `image` (data URI or URL) and makes it the profile picture.
    pub async fn update_profile_image(&self, actor: &Account, image: &str) -> Result<Account> {
        if image.trim().is_empty() {
            return Err(AppError::ValidationError("image is required".to_string()));
        }

        let uploaded = self.media.upload(image).await?;
        let account = self
            .accounts
            .set_profile_picture(actor.id, &uploaded.secure_url)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))?;

        info!("Updated profile picture for {}", actor.id);
        Ok(account)
    }
}
