use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::service::{Registration, Session};
use crate::config::Settings;
use crate::db::Account;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account: Account,
}

fn session_cookie(config: &Settings, session: &Session) -> Cookie<'static> {
    Cookie::build(config.auth.cookie_name.clone(), session.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(config.is_production())
        .max_age(time::Duration::seconds(session.ttl.num_seconds()))
        .finish()
}

pub async fn register(
    req: web::Json<Registration>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", req.username);

    let session = match state.auth.sign_up(req.into_inner()).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Registration failed: {}", e);
            return Err(e);
        }
    };

    info!("Registration successful for {}", session.account.username);
    Ok(HttpResponse::Created()
        .cookie(session_cookie(&state.config, &session))
        .json(AccountResponse {
            account: session.account,
        }))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);

    let session = match state.auth.sign_in(&req.email, &req.password).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Login failed for email: {}: {}", req.email, e);
            return Err(e);
        }
    };

    info!("Login successful for email: {}", req.email);
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&state.config, &session))
        .json(AccountResponse {
            account: session.account,
        }))
}

/// Tells the client to drop its session cookie. The token itself is not
/// revoked server-side and remains valid until it expires.
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut removal = Cookie::build(state.config.auth.cookie_name.clone(), "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.is_production())
        .finish();
    removal.make_removal();

    HttpResponse::Ok().cookie(removal).json(serde_json::json!({
        "message": "Successfully logged out"
    }))
}
