pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod mail;
pub mod media;
pub mod posts;
pub mod users;

use std::sync::Arc;
use std::time::Duration;
use actix_web::{web, HttpResponse};
use tracing::info;

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

pub use auth::{AuthService, AuthenticatedAccount};
pub use db::{Account, AccountStore, DbOperations, MemoryStore, PostStore};
pub use mail::Mailer;
pub use media::MediaHost;
pub use posts::PostService;
pub use users::ProfileService;

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Registers every route. Shared by `main` and the integration tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|_err, req| AppError::NotFound(req.path().to_string()).into()),
    )
    .route("/health", web::get().to(health_check))
    .service(
        web::scope("/auth")
            .route("/register", web::post().to(auth::handlers::register))
            .route("/login", web::post().to(auth::handlers::login))
            .route("/logout", web::post().to(auth::handlers::logout)),
    )
    .service(
        web::scope("/user")
            .route("/me", web::get().to(users::handlers::me))
            .route("/profile", web::put().to(users::handlers::update_profile))
            .route("/profile-image", web::post().to(users::handlers::update_profile_image))
            .route("/{id}", web::get().to(users::handlers::get_user)),
    )
    .service(
        web::scope("/post")
            .route("", web::post().to(posts::handlers::create_post))
            .route("/feed", web::get().to(posts::handlers::feed))
            .route("/{id}", web::get().to(posts::handlers::get_post))
            .route("/{id}", web::delete().to(posts::handlers::delete_post))
            .route("/{id}/like", web::post().to(posts::handlers::like_post))
            .route("/{id}/comments", web::post().to(posts::handlers::comment_post)),
    );
}

/// Application state shared across all components
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub profiles: Arc<ProfileService>,
    pub posts: Arc<PostService>,
}

impl AppState {
    /// Builds the stores and collaborators named by `config`.
    pub async fn new(config: Settings) -> Result<Self> {
        let (accounts, posts): (Arc<dyn AccountStore>, Arc<dyn PostStore>) =
            if config.database.url == "memory" {
                info!("Using in-memory store");
                let store = Arc::new(MemoryStore::new());
                (store.clone(), store)
            } else {
                let db = Arc::new(
                    DbOperations::new_with_options(
                        &config.database.url,
                        config.database.max_connections,
                        Duration::from_secs(config.database.acquire_timeout_secs),
                    )
                    .await?,
                );
                info!("Connected to database");
                (db.clone(), db)
            };

        let media = media::build_media_host(&config.media)?;
        let mailer = mail::build_mailer(&config.mail)?;

        Self::from_parts(config, accounts, posts, media, mailer)
    }

    /// Assembles state from explicitly constructed collaborators.
    pub fn from_parts(
        config: Settings,
        accounts: Arc<dyn AccountStore>,
        posts: Arc<dyn PostStore>,
        media: Arc<dyn MediaHost>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let auth = AuthService::from_config(&config.auth, accounts.clone(), mailer)?;

        Ok(Self {
            config: Arc::new(config),
            auth: Arc::new(auth),
            profiles: Arc::new(ProfileService::new(accounts.clone(), media.clone())),
            posts: Arc::new(PostService::new(posts, accounts, media)),
        })
    }
}
