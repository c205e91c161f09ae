//! Outbound mail. The only message is the welcome mail sent after
//! registration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::MailConfig;
use crate::db::Account;
use crate::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_welcome(&self, account: &Account) -> Result<(), AppError>;
}

pub fn build_mailer(config: &MailConfig) -> Result<Arc<dyn Mailer>, AppError> {
    match &config.token {
        Some(token) => {
            info!("Welcome mail enabled via {}", config.api_url);
            Ok(Arc::new(HttpMailer::new(
                &config.api_url,
                token.clone(),
                config.sender_email.clone(),
                config.sender_name.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        None => {
            info!("Mail token not set, welcome mail disabled");
            Ok(Arc::new(NoopMailer))
        }
    }
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    from: Address<'a>,
    to: Vec<Address<'a>>,
    subject: &'a str,
    text: String,
    html: String,
    category: &'a str,
}

/// Sends mail through a JSON send API authenticated with a bearer token.
pub struct HttpMailer {
    client: reqwest::Client,
    send_url: String,
    token: String,
    sender_email: String,
    sender_name: String,
}

impl HttpMailer {
    /// `timeout` bounds each request, connect to last body byte.
    pub fn new(
        api_url: &str,
        token: String,
        sender_email: String,
        sender_name: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::MailError(format!("Failed to build mail client: {}", e)))?;

        Ok(Self {
            client,
            send_url: format!("{}/api/send", api_url.trim_end_matches('/')),
            token,
            sender_email,
            sender_name,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_welcome(&self, account: &Account) -> Result<(), AppError> {
        let request = SendRequest {
            from: Address {
                email: &self.sender_email,
                name: Some(&self.sender_name),
            },
            to: vec![Address {
                email: &account.email,
                name: Some(&account.name),
            }],
            subject: "Welcome to LinkUp",
            text: format!("Welcome to LinkUp, {}!", account.name),
            html: format!("<h1>Welcome, {}.</h1><p>Your account is ready.</p>", account.username),
            category: "Welcome",
        };

        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::MailError(format!("Mail request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::MailError(format!(
                "Mail API returned {}",
                response.status()
            )));
        }

        debug!("Welcome mail sent to {}", account.email);
        Ok(())
    }
}

pub struct NoopMailer;

#[async_trait]
impl Mailer for NoopMailer {
    async fn send_welcome(&self, account: &Account) -> Result<(), AppError> {
        debug!("Skipping welcome mail for {}", account.email);
        Ok(())
    }
}
