//! Media Host HTTP Client - Signed Asset Deletion
//!
//! Implements the `AssetHost` port against the media host's admin API.
//! A deletion is a form POST to `{api_base}/v1_1/{cloud}/image/destroy`
//! carrying `{public_id, timestamp, api_key, signature,
//! signature_algorithm}`. No retries: the janitor reports the outcome
//! and moves on.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::signer::{MediaSigner, SIGNATURE_ALGORITHM, unix_timestamp};
use crate::config::{MediaConfig, MediaCredentials};
use crate::ports::asset_host::{AssetError, AssetHost, DestroyOutcome};

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Signed HTTP client for the media host.
pub struct MediaHostClient {
    /// Underlying HTTP client.
    http: Client,
    signer: MediaSigner,
    /// Fully-qualified destroy endpoint.
    destroy_url: String,
}

impl MediaHostClient {
    /// Create a new client. The request timeout comes from `config`.
    pub fn new(credentials: MediaCredentials, config: &MediaConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .pool_max_idle_per_host(2)
            .build()
            .context("Failed to build media host HTTP client")?;

        let destroy_url = format!(
            "{}/v1_1/{}/image/destroy",
            config.api_base_url.trim_end_matches('/'),
            credentials.cloud_name
        );

        Ok(Self {
            http,
            signer: MediaSigner::new(credentials),
            destroy_url,
        })
    }

    pub fn destroy_url(&self) -> &str {
        &self.destroy_url
    }
}

#[async_trait]
impl AssetHost for MediaHostClient {
    #[instrument(skip(self))]
    async fn destroy(&self, public_id: &str) -> Result<DestroyOutcome, AssetError> {
        let timestamp = unix_timestamp().to_string();
        let signature = self
            .signer
            .sign(&[("public_id", public_id), ("timestamp", timestamp.as_str())]);

        let form = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.signer.api_key()),
            ("signature", signature.as_str()),
            ("signature_algorithm", SIGNATURE_ALGORITHM),
        ];

        let response = self
            .http
            .post(&self.destroy_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AssetError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AssetError::Transport(e.to_string()))?;
        debug!(status = status.as_u16(), "Destroy response received");

        if !status.is_success() {
            return Err(AssetError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DestroyResponse =
            serde_json::from_str(&body).map_err(|_| AssetError::UnexpectedResult(body.clone()))?;

        match parsed.result.as_str() {
            "ok" => Ok(DestroyOutcome::Deleted),
            "not found" => Ok(DestroyOutcome::AlreadyGone),
            other => Err(AssetError::UnexpectedResult(other.to_string())),
        }
    }
}

/// Stand-in used when media credentials are missing.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredHost;

#[async_trait]
impl AssetHost for UnconfiguredHost {
    async fn destroy(&self, _public_id: &str) -> Result<DestroyOutcome, AssetError> {
        Err(AssetError::NotConfigured)
    }
}
