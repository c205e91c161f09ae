use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::password::CredentialHasher;
use crate::auth::token::TokenSigner;
use crate::auth::MIN_PASSWORD_LENGTH;
use crate::config::AuthConfig;
use crate::db::{Account, AccountRecord, AccountStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::mail::Mailer;
use crate::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// A freshly authenticated account and the token proving it.
#[derive(Debug, Clone)]
pub struct Session {
    pub account: Account,
    pub token: String,
    pub ttl: Duration,
}

/// Credential checks plus session token issuance and verification.
///
/// Tokens are stateless: logging out only drops the client cookie, so a
/// copied token stays valid until its own expiry. Callers needing hard
/// revocation must add a denylist in front of [`AuthService::verify`].
pub struct AuthService {
    accounts: Arc<dyn AccountStore>,
    mailer: Arc<dyn Mailer>,
    hasher: CredentialHasher,
    tokens: TokenSigner,
    register_ttl: Duration,
    login_ttl: Duration,
}

impl AuthService {
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
        hasher: CredentialHasher,
        tokens: TokenSigner,
        register_ttl: Duration,
        login_ttl: Duration,
    ) -> Self {
        Self {
            accounts,
            mailer,
            hasher,
            tokens,
            register_ttl,
            login_ttl,
        }
    }

    pub fn from_config(
        config: &AuthConfig,
        accounts: Arc<dyn AccountStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self> {
        let hasher = CredentialHasher::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )?;

        Ok(Self::new(
            accounts,
            mailer,
            hasher,
            TokenSigner::new(&config.jwt_secret),
            Duration::hours(config.register_token_ttl_hours),
            Duration::hours(config.login_token_ttl_hours),
        ))
    }

    /// Validates and stores a new account. The password length is checked
    /// before any lookup, so a short password is always `WeakPassword`.
    pub async fn register(&self, registration: Registration) -> Result<Account> {
        if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::WeakPassword.into());
        }
        for (field, value) in [
            ("name", &registration.name),
            ("username", &registration.username),
            ("email", &registration.email),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::ValidationError(format!("{} is required", field)));
            }
        }

        if self.accounts.find_record_by_email(&registration.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail.into());
        }
        if self.accounts.username_exists(&registration.username).await? {
            return Err(AuthError::DuplicateUsername.into());
        }

        let Registration {
            name,
            username,
            email,
            password,
        } = registration;
        let password_hash = self.hasher.hash_blocking(password).await?;
        let record = AccountRecord::new(name, username, email, password_hash);

        let account = match self.accounts.create_account(&record).await {
            Ok(account) => account,
            // Lost a race with a concurrent registration.
            Err(DatabaseError::Duplicate(field)) if field == "email" => {
                return Err(AuthError::DuplicateEmail.into())
            }
            Err(DatabaseError::Duplicate(field)) if field == "username" => {
                return Err(AuthError::DuplicateUsername.into())
            }
            Err(e) => return Err(e.into()),
        };
        info!("Registered account {} ({})", account.id, account.username);

        self.send_welcome(account.clone());

        Ok(account)
    }

    /// Sends the welcome mail on a background task. Registration never waits
    /// on the mail API; failures are only logged.
    fn send_welcome(&self, account: Account) -> JoinHandle<()> {
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send_welcome(&account).await {
                warn!("Welcome mail to {} failed: {}", account.email, e);
            }
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Account> {
        let record = self
            .accounts
            .find_record_by_email(email)
            .await?
            .ok_or(AuthError::UnknownEmail)?;

        let matches = self
            .hasher
            .verify_blocking(password.to_string(), record.password_hash.clone())
            .await?;
        if !matches {
            return Err(AuthError::PasswordMismatch.into());
        }

        Ok(record.into_account())
    }

    pub fn issue(&self, account: &Account, ttl: Duration) -> Result<String> {
        Ok(self.tokens.issue(account.id, ttl)?)
    }

    /// Registers and opens a session with the registration TTL.
    pub async fn sign_up(&self, registration: Registration) -> Result<Session> {
        let account = self.register(registration).await?;
        let token = self.issue(&account, self.register_ttl)?;
        Ok(Session {
            account,
            token,
            ttl: self.register_ttl,
        })
    }

    /// Logs in and opens a session with the login TTL.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let account = self.login(email, password).await?;
        let token = self.issue(&account, self.login_ttl)?;
        debug!("Issued session token for {}", account.id);
        Ok(Session {
            account,
            token,
            ttl: self.login_ttl,
        })
    }

    /// Resolves a presented token to its account.
    pub async fn verify(&self, token: Option<&str>) -> Result<Account> {
        self.verify_at(token, Utc::now()).await
    }

    pub async fn verify_at(&self, token: Option<&str>, now: DateTime<Utc>) -> Result<Account> {
        let token = token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::TokenMissing)?;
        let subject = self.tokens.verify_at(token, now)?;

        let account = self
            .accounts
            .find_account_by_id(subject)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::mail::{HttpMailer, MockMailer, NoopMailer};
    use std::time::Duration as StdDuration;
    use uuid::Uuid;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn service_with(accounts: Arc<dyn AccountStore>, mailer: Arc<dyn Mailer>, secret: &str) -> AuthService {
        AuthService::new(
            accounts,
            mailer,
            CredentialHasher::new(1024, 1, 1).unwrap(),
            TokenSigner::new(secret),
            Duration::hours(72),
            Duration::hours(48),
        )
    }

    fn service() -> AuthService {
        service_with(Arc::new(MemoryStore::new()), Arc::new(NoopMailer), "test_secret")
    }

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            name: "Ada".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    fn auth_error(result: Result<impl std::fmt::Debug>) -> AuthError {
        match result {
            Err(AppError::AuthError(e)) => e,
            other => panic!("Expected auth error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let auth = service();
        let account = auth
            .register(registration("ada1", "ada@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(account.username, "ada1");

        let err = auth_error(auth.login("ada@x.com", "wrong").await);
        assert!(matches!(err, AuthError::PasswordMismatch));

        let logged_in = auth.login("ada@x.com", "secret1").await.unwrap();
        assert_eq!(logged_in.id, account.id);

        let err = auth_error(auth.login("nobody@x.com", "secret1").await);
        assert!(matches!(err, AuthError::UnknownEmail));
    }

    #[tokio::test]
    async fn test_duplicate_email_regardless_of_other_fields() {
        let auth = service();
        auth.register(registration("ada1", "ada@x.com", "secret1")).await.unwrap();

        let err = auth_error(auth.register(registration("someone", "ada@x.com", "another-pass")).await);
        assert!(matches!(err, AuthError::DuplicateEmail));

        let err = auth_error(auth.register(registration("ada1", "ada@x.com", "secret1")).await);
        assert!(matches!(err, AuthError::DuplicateEmail));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let auth = service();
        auth.register(registration("ada1", "ada@x.com", "secret1")).await.unwrap();

        let err = auth_error(auth.register(registration("ada1", "other@x.com", "secret1")).await);
        assert!(matches!(err, AuthError::DuplicateUsername));
    }

    #[tokio::test]
    async fn test_weak_password_wins_over_other_checks() {
        let auth = service();
        auth.register(registration("ada1", "ada@x.com", "secret1")).await.unwrap();

        for password in ["", "a", "12345", "äöüßé"] {
            let err = auth_error(auth.register(registration("ada1", "ada@x.com", password)).await);
            assert!(matches!(err, AuthError::WeakPassword), "password {:?}", password);

            let err = auth_error(auth.register(registration("", "", password)).await);
            assert!(matches!(err, AuthError::WeakPassword), "password {:?}", password);
        }
    }

    #[tokio::test]
    async fn test_blank_fields_rejected() {
        let auth = service();
        let result = auth.register(registration("  ", "ada@x.com", "secret1")).await;
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_stored_hash_is_not_plaintext() {
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(store.clone(), Arc::new(NoopMailer), "test_secret");
        auth.register(registration("ada1", "ada@x.com", "secret1")).await.unwrap();

        let record = store.find_record_by_email("ada@x.com").await.unwrap().unwrap();
        assert!(!record.password_hash.contains("secret1"));
        assert!(record.password_hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_block_registration() {
        let (sent, mut received) = tokio::sync::mpsc::unbounded_channel();
        let mut mailer = MockMailer::new();
        mailer
            .expect_send_welcome()
            .times(1)
            .returning(move |account| {
                let _ = sent.send(account.email.clone());
                Err(AppError::MailError("smtp down".to_string()))
            });

        let auth = service_with(Arc::new(MemoryStore::new()), Arc::new(mailer), "test_secret");
        let account = auth.register(registration("ada1", "ada@x.com", "secret1")).await;
        assert!(account.is_ok());

        let recipient = tokio::time::timeout(StdDuration::from_secs(5), received.recv())
            .await
            .expect("welcome mail was attempted");
        assert_eq!(recipient.as_deref(), Some("ada@x.com"));
    }

    #[tokio::test]
    async fn test_slow_mail_api_does_not_delay_registration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/send"))
            .respond_with(ResponseTemplate::new(200).set_delay(StdDuration::from_secs(30)))
            .mount(&server)
            .await;
        let mailer = HttpMailer::new(
            &server.uri(),
            "mail-token".to_string(),
            "hello@linkup.local".to_string(),
            "Team LinkUp".to_string(),
            StdDuration::from_secs(60),
        )
        .unwrap();

        let auth = service_with(Arc::new(MemoryStore::new()), Arc::new(mailer), "test_secret");
        let registered = tokio::time::timeout(
            StdDuration::from_secs(5),
            auth.register(registration("ada1", "ada@x.com", "secret1")),
        )
        .await
        .expect("registration waited on the mail API");
        assert!(registered.is_ok());
    }

    #[tokio::test]
    async fn test_failed_registration_sends_no_mail() {
        let mut mailer = MockMailer::new();
        mailer.expect_send_welcome().times(0);

        let auth = service_with(Arc::new(MemoryStore::new()), Arc::new(mailer), "test_secret");
        assert!(auth.register(registration("ada1", "ada@x.com", "short")).await.is_err());
    }

    #[tokio::test]
    async fn test_verify_session_tokens() {
        let auth = service();
        let session = auth
            .sign_up(registration("ada1", "ada@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(session.ttl, Duration::hours(72));

        let account = auth.verify(Some(&session.token)).await.unwrap();
        assert_eq!(account.username, "ada1");

        let session = auth.sign_in("ada@x.com", "secret1").await.unwrap();
        assert_eq!(session.ttl, Duration::hours(48));
        assert!(auth.verify(Some(&session.token)).await.is_ok());

        let err = auth_error(auth.verify(None).await);
        assert!(matches!(err, AuthError::TokenMissing));
        let err = auth_error(auth.verify(Some("")).await);
        assert!(matches!(err, AuthError::TokenMissing));
        let err = auth_error(auth.verify(Some("garbage")).await);
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    #[tokio::test]
    async fn test_verify_expired_token() {
        let auth = service();
        let session = sign_in_after_register(&auth).await;
        let later = Utc::now() + Duration::hours(49);
        let err = auth_error(auth.verify_at(Some(&session.token), later).await);
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[tokio::test]
    async fn test_verify_unknown_subject() {
        let auth = service();
        let token = TokenSigner::new("test_secret")
            .issue(Uuid::new_v4(), Duration::hours(1))
            .unwrap();
        let err = auth_error(auth.verify(Some(&token)).await);
        assert!(matches!(err, AuthError::UnknownSubject));
    }

    #[tokio::test]
    async fn test_token_from_other_secret_rejected() {
        let store: Arc<dyn AccountStore> = Arc::new(MemoryStore::new());
        let issuer = service_with(store.clone(), Arc::new(NoopMailer), "secret-one");
        let verifier = service_with(store, Arc::new(NoopMailer), "secret-two");

        let session = issuer
            .sign_up(registration("ada1", "ada@x.com", "secret1"))
            .await
            .unwrap();
        let err = auth_error(verifier.verify(Some(&session.token)).await);
        assert!(matches!(err, AuthError::TokenInvalid));
    }

    async fn sign_in_after_register(auth: &AuthService) -> Session {
        auth.register(registration("ada1", "ada@x.com", "secret1"))
            .await
            .unwrap();
        auth.sign_in("ada@x.com", "secret1").await.unwrap()
    }
}
