use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthenticatedAccount;
use crate::db::ProfileChanges;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileImageRequest {
    pub image: String,
}

pub async fn me(account: AuthenticatedAccount) -> HttpResponse {
    HttpResponse::Ok().json(account.into_inner())
}

pub async fn get_user(
    _viewer: AuthenticatedAccount,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let account = state.profiles.get_account(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(account))
}

pub async fn update_profile(
    account: AuthenticatedAccount,
    req: web::Json<ProfileChanges>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let updated = state.profiles.update_profile(&account, req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

pub async fn update_profile_image(
    account: AuthenticatedAccount,
    req: web::Json<ProfileImageRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let updated = state.profiles.update_profile_image(&account, &req.image).await?;
    Ok(HttpResponse::Ok().json(updated))
}
