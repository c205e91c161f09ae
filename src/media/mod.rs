//! Media host integration for profile pictures and post images.
//!
//! Images arrive as data URIs or remote URLs and are handed to the host
//! unchanged; the host answers with a public HTTPS URL and an id used to
//! destroy the asset later.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::MediaConfig;
use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, image: &str) -> Result<UploadedImage, AppError>;

    async fn destroy(&self, public_id: &str) -> Result<(), AppError>;
}

/// Picks the HTTP host when credentials are configured.
pub fn build_media_host(config: &MediaConfig) -> Result<Arc<dyn MediaHost>, AppError> {
    match (&config.cloud_name, &config.api_key, &config.api_secret) {
        (Some(cloud_name), Some(api_key), Some(api_secret)) => {
            info!("Media uploads enabled for cloud {}", cloud_name);
            Ok(Arc::new(HttpMediaHost::new(
                &config.api_base,
                cloud_name,
                api_key.clone(),
                api_secret.clone(),
                config.folder.clone(),
                Duration::from_secs(config.timeout_secs),
            )?))
        }
        _ => {
            info!("Media host credentials not set, uploads disabled");
            Ok(Arc::new(DisabledMediaHost))
        }
    }
}

/// Client for a signed image upload API.
pub struct HttpMediaHost {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct HostErrorBody {
    error: HostErrorMessage,
}

#[derive(Debug, Deserialize)]
struct HostErrorMessage {
    message: String,
}

impl HttpMediaHost {
    pub fn new(
        api_base: &str,
        cloud_name: &str,
        api_key: String,
        api_secret: String,
        folder: String,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::MediaError(format!("Failed to build media client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/{}/image", api_base.trim_end_matches('/'), cloud_name),
            api_key,
            api_secret,
            folder,
        })
    }

    async fn post_signed(
        &self,
        action: &str,
        params: &[(&str, &str)],
        extra: &[(&str, &str)],
    ) -> Result<reqwest::Response, AppError> {
        let timestamp = Utc::now().timestamp().to_string();
        let mut signed: Vec<(&str, &str)> = params.to_vec();
        signed.push(("timestamp", timestamp.as_str()));
        let signature = sign_params(&signed, &self.api_secret);

        let mut form = signed;
        form.extend_from_slice(extra);
        form.push(("api_key", self.api_key.as_str()));
        form.push(("signature", signature.as_str()));
        form.push(("signature_algorithm", "sha256"));

        let response = self
            .client
            .post(format!("{}/{}", self.endpoint, action))
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::MediaError(format!("Request to media host failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let message = response
            .json::<HostErrorBody>()
            .await
            .map(|body| body.error.message)
            .unwrap_or_else(|_| "no error message".to_string());
        Err(AppError::MediaError(format!("Media host returned {}: {}", status, message)))
    }
}

#[async_trait]
impl MediaHost for HttpMediaHost {
    async fn upload(&self, image: &str) -> Result<UploadedImage, AppError> {
        let response = self
            .post_signed("upload", &[("folder", self.folder.as_str())], &[("file", image)])
            .await?;

        let uploaded: UploadedImage = response
            .json()
            .await
            .map_err(|e| AppError::MediaError(format!("Invalid upload response: {}", e)))?;

        debug!("Uploaded image {}", uploaded.public_id);
        Ok(uploaded)
    }

    async fn destroy(&self, public_id: &str) -> Result<(), AppError> {
        let response = self
            .post_signed("destroy", &[("public_id", public_id)], &[])
            .await?;

        let body: DestroyResponse = response
            .json()
            .await
            .map_err(|e| AppError::MediaError(format!("Invalid destroy response: {}", e)))?;

        if body.result != "ok" {
            return Err(AppError::MediaError(format!(
                "Could not destroy {}: {}",
                public_id, body.result
            )));
        }

        debug!("Destroyed image {}", public_id);
        Ok(())
    }
}

/// Used when no media credentials are configured.
pub struct DisabledMediaHost;

#[async_trait]
impl MediaHost for DisabledMediaHost {
    async fn upload(&self, _image: &str) -> Result<UploadedImage, AppError> {
        Err(AppError::MediaError("Media uploads are not configured".to_string()))
    }

    async fn destroy(&self, _public_id: &str) -> Result<(), AppError> {
        Ok(())
    }
}

/// SHA-256 hex digest over `key=value` pairs sorted by key and joined with
/// `&`, followed by the API secret.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
