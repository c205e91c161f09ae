use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{
    Account, AccountStore, AccountSummary, Comment, CommentView, FeedPost, Post, PostStore,
};
use crate::error::AppError;
use crate::media::MediaHost;
use crate::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub content: String,
    pub image: Option<String>,
}

pub struct PostService {
    posts: Arc<dyn PostStore>,
    accounts: Arc<dyn AccountStore>,
    media: Arc<dyn MediaHost>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        accounts: Arc<dyn AccountStore>,
        media: Arc<dyn MediaHost>,
    ) -> Self {
        Self {
            posts,
            accounts,
            media,
        }
    }

    /// Every post, newest first, with authors resolved.
    pub async fn feed(&self) -> Result<Vec<FeedPost>> {
        let posts = self.posts.list_posts().await?;
        self.resolve(posts).await
    }

    pub async fn get(&self, id: Uuid) -> Result<FeedPost> {
        let post = self.find(id).await?;
        self.resolve_one(post).await
    }

    /// Creates a post authored by `author`. A failed image upload is only
    /// fatal when the post would otherwise be empty.
    pub async fn create(&self, author: &Account, new_post: NewPost) -> Result<FeedPost> {
        let content = new_post.content.trim().to_string();
        let image = new_post.image.filter(|image| !image.trim().is_empty());
        if content.is_empty() && image.is_none() {
            return Err(AppError::ValidationError(
                "A post needs content or an image".to_string(),
            ));
        }

        let mut post = Post::new(author.id, content);
        if let Some(image) = image {
            match self.media.upload(&image).await {
                Ok(uploaded) => post = post.with_image(uploaded.secure_url, uploaded.public_id),
                Err(e) if post.content.is_empty() => return Err(e),
                Err(e) => warn!("Image upload for new post by {} failed: {}", author.id, e),
            }
        }

        let post = self.posts.create_post(&post).await?;
        info!("Account {} created post {}", author.id, post.id);
        self.resolve_one(post).await
    }

    /// Deletes a post owned by `actor`, then its hosted image. The image is
    /// only touched once the row is gone.
    pub async fn delete(&self, actor: &Account, id: Uuid) -> Result<()> {
        let post = self.find(id).await?;
        if post.author_id != actor.id {
            return Err(AppError::Forbidden(
                "You are not authorized to delete this post".to_string(),
            ));
        }

        if !self.posts.delete_post(id).await? {
            return Err(AppError::NotFound("Post".to_string()));
        }
        info!("Account {} deleted post {}", actor.id, id);

        if !post.image_id.is_empty() {
            if let Err(e) = self.media.destroy(&post.image_id).await {
                warn!("Could not delete image {} of post {}: {}", post.image_id, id, e);
            }
        }
        Ok(())
    }

    pub async fn toggle_like(&self, actor: &Account, id: Uuid) -> Result<FeedPost> {
        let post = self
            .posts
            .toggle_like(id, actor.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
        self.resolve_one(post).await
    }

    pub async fn comment(&self, actor: &Account, id: Uuid, content: &str) -> Result<FeedPost> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::ValidationError("Comment cannot be empty".to_string()));
        }

        let post = self
            .posts
            .add_comment(id, &Comment::new(actor.id, content.to_string()))
            .await?
            .ok_or_else(|| AppError::NotFound("Post".to_string()))?;
        self.resolve_one(post).await
    }

    async fn find(&self, id: Uuid) -> Result<Post> {
        self.posts
            .find_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post".to_string()))
    }

    async fn resolve_one(&self, post: Post) -> Result<FeedPost> {
        let mut resolved = self.resolve(vec![post]).await?;
        resolved
            .pop()
            .ok_or_else(|| AppError::InternalError("Post vanished while resolving".to_string()))
    }

    /// Replaces author ids with summaries using a single account lookup.
    async fn resolve(&self, posts: Vec<Post>) -> Result<Vec<FeedPost>> {
        let ids: HashSet<Uuid> = posts
            .iter()
            .flat_map(|post| {
                std::iter::once(post.author_id)
                    .chain(post.comments.iter().map(|comment| comment.author_id))
            })
            .collect();
        let ids: Vec<Uuid> = ids.into_iter().collect();

        let authors: HashMap<Uuid, AccountSummary> = self
            .accounts
            .find_accounts_by_ids(&ids)
            .await?
            .iter()
            .map(|account| (account.id, AccountSummary::from(account)))
            .collect();

        Ok(posts
            .into_iter()
            .map(|post| FeedPost {
                id: post.id,
                author: authors.get(&post.author_id).cloned(),
                content: post.content,
                image: post.image,
                likes: post.likes,
                comments: post
                    .comments
                    .into_iter()
                    .map(|comment| CommentView {
                        id: comment.id,
                        author: authors.get(&comment.author_id).cloned(),
                        content: comment.content,
                        created_at: comment.created_at,
                    })
                    .collect(),
                created_at: post.created_at,
                updated_at: post.updated_at,
            })
            .collect())
    }
}
