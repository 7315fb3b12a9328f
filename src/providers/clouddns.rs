//! Google Cloud DNS backend over the v1 REST API.

use super::{Change, RecordStore, ResourceRecordSet, TokenSource};
use crate::config::DEFAULT_CLOUD_DNS_API;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const PROVIDER: &str = "clouddns";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Record sets of one managed zone in one project.
pub struct CloudDnsStore {
    client: reqwest::Client,
    project_id: String,
    managed_zone: String,
    tokens: Box<dyn TokenSource>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    rrsets: Vec<ResourceRecordSet>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl CloudDnsStore {
    /// Create a store against the public Cloud DNS API.
    pub fn new(
        project_id: String,
        managed_zone: String,
        tokens: Box<dyn TokenSource>,
    ) -> Result<Self> {
        Self::with_base_url(
            project_id,
            managed_zone,
            tokens,
            DEFAULT_CLOUD_DNS_API.to_string(),
        )
    }

    /// Create with custom base URL (for testing).
    pub fn with_base_url(
        project_id: String,
        managed_zone: String,
        tokens: Box<dyn TokenSource>,
        base_url: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            project_id,
            managed_zone,
            tokens,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn zone_url(&self, resource: &str) -> String {
        format!(
            "{}/dns/v1/projects/{}/managedZones/{}/{}",
            self.base_url, self.project_id, self.managed_zone, resource
        )
    }

    /// Turn a non-success response into a provider error, preferring the API's own message.
    async fn api_error(context: &str, response: reqwest::Response) -> DdnsError {
        let status = response.status();
        let detail = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => format!("HTTP {}", status),
        };
        DdnsError::provider(PROVIDER, format!("{}: {}", context, detail))
    }

    async fn list_page(&self, token: &str, page_token: Option<&str>) -> Result<ListResponse> {
        let mut request = self.client.get(self.zone_url("rrsets")).bearer_auth(token);
        if let Some(page_token) = page_token {
            request = request.query(&[("pageToken", page_token)]);
        }

        let response = request.send().await.map_err(|e| {
            DdnsError::provider(PROVIDER, format!("failed to list resource record sets: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(Self::api_error("failed to list resource record sets", response).await);
        }

        response.json().await.map_err(|e| {
            DdnsError::provider(PROVIDER, format!("invalid record set listing: {}", e))
        })
    }
}

#[async_trait]
impl RecordStore for CloudDnsStore {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn zone(&self) -> String {
        format!("{}/{}", self.project_id, self.managed_zone)
    }

    async fn list_record_sets(&self) -> Result<Vec<ResourceRecordSet>> {
        let token = self.tokens.token().await?;

        let mut rrsets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(&token, page_token.as_deref()).await?;
            rrsets.extend(page.rrsets);

            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        tracing::debug!("Listed {} record sets in {}", rrsets.len(), self.zone());
        Ok(rrsets)
    }

    async fn submit_change(&self, change: &Change) -> Result<()> {
        let token = self.tokens.token().await?;

        let response = self
            .client
            .post(self.zone_url("changes"))
            .bearer_auth(&token)
            .json(change)
            .send()
            .await
            .map_err(|e| {
                DdnsError::provider(PROVIDER, format!("failed to create DNS change: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(Self::api_error("failed to create DNS change", response).await);
        }

        Ok(())
    }
}
