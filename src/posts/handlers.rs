use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedAccount;
use crate::error::AppError;
use crate::posts::NewPost;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub content: String,
}

pub async fn feed(
    _viewer: AuthenticatedAccount,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let posts = state.posts.feed().await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn create_post(
    account: AuthenticatedAccount,
    req: web::Json<NewPost>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = state.posts.create(&account, req.into_inner()).await?;
    Ok(HttpResponse::Created().json(post))
}

pub async fn get_post(
    _viewer: AuthenticatedAccount,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = state.posts.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    account: AuthenticatedAccount,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    state.posts.delete(&account, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Post deleted"
    })))
}

pub async fn like_post(
    account: AuthenticatedAccount,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = state.posts.toggle_like(&account, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn comment_post(
    account: AuthenticatedAccount,
    path: web::Path<Uuid>,
    req: web::Json<CommentRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = state
        .posts
        .comment(&account, path.into_inner(), &req.content)
        .await?;
    Ok(HttpResponse::Created().json(post))
}
