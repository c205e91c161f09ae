use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Public view of an account. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub email: String,
    pub profile_picture: String,
    pub banner_img: String,
    pub headline: String,
    pub location: String,
    pub about: String,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Stored form of an account, including the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRecord {
    #[sqlx(flatten)]
    pub account: Account,
    pub password_hash: String,
}

impl AccountRecord {
    pub fn new(name: String, username: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            account: Account {
                id: Uuid::new_v4(),
                name,
                username,
                email,
                profile_picture: String::new(),
                banner_img: String::new(),
                headline: String::new(),
                location: String::new(),
                about: String::new(),
                skills: Vec::new(),
                created_at: now,
                updated_at: now,
            },
            password_hash,
        }
    }

    pub fn into_account(self) -> Account {
        self.account
    }
}

/// Author details embedded in feed entries and comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub name: String,
    pub username: String,
    pub profile_picture: String,
    pub headline: String,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            username: account.username.clone(),
            profile_picture: account.profile_picture.clone(),
            headline: account.headline.clone(),
        }
    }
}

/// Partial profile update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub headline: Option<String>,
    pub location: Option<String>,
    pub about: Option<String>,
    pub banner_img: Option<String>,
    pub skills: Option<Vec<String>>,
}

impl ProfileChanges {
    pub fn apply(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.clone();
        }
        if let Some(headline) = &self.headline {
            account.headline = headline.clone();
        }
        if let Some(location) = &self.location {
            account.location = location.clone();
        }
        if let Some(about) = &self.about {
            account.about = about.clone();
        }
        if let Some(banner_img) = &self.banner_img {
            account.banner_img = banner_img.clone();
        }
        if let Some(skills) = &self.skills {
            account.skills = skills.clone();
        }
        account.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            content,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub image: String,
    /// Media host id of `image`, used to destroy it with the post.
    pub image_id: String,
    pub likes: Vec<Uuid>,
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: Uuid, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            author_id,
            content,
            image: String::new(),
            image_id: String::new(),
            likes: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_image(mut self, url: String, image_id: String) -> Self {
        self.image = url;
        self.image_id = image_id;
        self
    }

    /// Likes the post for `account_id`, or removes an existing like.
    /// Returns whether the account now likes the post.
    pub fn toggle_like(&mut self, account_id: Uuid) -> bool {
        let liked = if self.likes.contains(&account_id) {
            self.likes.retain(|id| *id != account_id);
            false
        } else {
            self.likes.push(account_id);
            true
        };
        self.updated_at = Utc::now();
        liked
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub author: Option<AccountSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A post with its author and comment authors resolved.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPost {
    pub id: Uuid,
    pub author: Option<AccountSummary>,
    pub content: String,
    pub image: String,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
