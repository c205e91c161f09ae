use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::db::Account;
use crate::error::AppError;
use crate::AppState;

/// Extractor for protected handlers: reads the session cookie and resolves
/// it through [`AuthService::verify`](crate::auth::AuthService::verify).
#[derive(Debug, Clone)]
pub struct AuthenticatedAccount(pub Account);

impl AuthenticatedAccount {
    pub fn into_inner(self) -> Account {
        self.0
    }
}

impl std::ops::Deref for AuthenticatedAccount {
    type Target = Account;

    fn deref(&self) -> &Account {
        &self.0
    }
}

impl FromRequest for AuthenticatedAccount {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = state
            .as_ref()
            .and_then(|state| req.cookie(&state.config.auth.cookie_name))
            .map(|cookie| cookie.value().to_string());

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::InternalError("Application state not configured".to_string()))?;
            let account = state.auth.verify(token.as_deref()).await?;
            Ok(AuthenticatedAccount(account))
        })
    }
}
