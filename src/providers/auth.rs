//! Bearer tokens for the Cloud DNS API.

use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Refresh this long before the metadata server says the token expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of OAuth bearer tokens.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Return a token valid for at least the next request.
    async fn token(&self) -> Result<String>;
}

/// A fixed token supplied by the operator.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: String) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        if self.token.is_empty() {
            return Err(DdnsError::Auth("access token is empty".to_string()));
        }
        Ok(self.token.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Tokens for the instance's default service account, from the GCE metadata server.
pub struct MetadataToken {
    client: reqwest::Client,
    url: String,
    cached: Mutex<Option<(String, Instant)>>,
}

impl MetadataToken {
    pub fn new() -> Result<Self> {
        Self::with_url(METADATA_TOKEN_URL.to_string())
    }

    /// Create with custom token URL (for testing).
    pub fn with_url(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            url,
            cached: Mutex::new(None),
        })
    }

    async fn fetch(&self) -> Result<MetadataTokenResponse> {
        let response = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| DdnsError::Auth(format!("metadata server unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(DdnsError::Auth(format!(
                "metadata server returned HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DdnsError::Auth(format!("invalid token response: {}", e)))
    }
}

#[async_trait]
impl TokenSource for MetadataToken {
    async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some((token, expires_at)) = cached.as_ref() {
            if Instant::now() < *expires_at {
                return Ok(token.clone());
            }
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_MARGIN);
        tracing::debug!("Fetched metadata token valid for {}s", lifetime.as_secs());

        *cached = Some((fresh.access_token.clone(), Instant::now() + lifetime));
        Ok(fresh.access_token)
    }
}
