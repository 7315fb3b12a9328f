//! Configuration management for cloud-ddns.
//!
//! All settings come from environment variables and are read once at startup.

use crate::error::{DdnsError, Result};
use std::time::Duration;

/// Default IP echo service.
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// Default Cloud DNS API base URL.
pub const DEFAULT_CLOUD_DNS_API: &str = "https://dns.googleapis.com";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Fully-qualified domains to manage, in configured order.
    pub domains: Vec<String>,

    /// Cloud project owning the managed zone.
    pub project_id: String,

    /// Managed zone resource name.
    pub managed_zone: String,

    /// Chat webhook for notifications. `None` logs notifications instead.
    pub webhook_url: Option<String>,

    /// Minutes to sleep between reconciliation cycles.
    pub wait_in_minutes: u64,

    /// IP echo endpoint.
    pub ip_service_url: String,

    /// Static bearer token for the Cloud DNS API.
    pub access_token: Option<String>,

    /// Cloud DNS API base URL.
    pub api_base_url: String,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).unwrap_or_default();
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let wait_raw = get("WAIT_IN_MINUTE");
        let wait_in_minutes = wait_raw.trim().parse::<u64>().map_err(|e| {
            DdnsError::Config(format!(
                "WAIT_IN_MINUTE must be an integer, got {:?}: {}",
                wait_raw, e
            ))
        })?;
        if wait_in_minutes.checked_mul(60).is_none() {
            return Err(DdnsError::Config(format!(
                "WAIT_IN_MINUTE is too large: {}",
                wait_in_minutes
            )));
        }

        Ok(Self {
            domains: parse_domains(&get("DOMAINS")),
            project_id: get("PROJECT_ID").trim().to_string(),
            managed_zone: get("MANAGED_ZONE").trim().to_string(),
            webhook_url: optional("WEBHOOK_URL"),
            wait_in_minutes,
            ip_service_url: optional("IP_SERVICE_URL")
                .unwrap_or_else(|| DEFAULT_IP_SERVICE.to_string()),
            access_token: optional("CLOUD_DNS_ACCESS_TOKEN"),
            api_base_url: optional("CLOUD_DNS_API_URL")
                .unwrap_or_else(|| DEFAULT_CLOUD_DNS_API.to_string()),
        })
    }

    /// Check that the required settings are present.
    pub fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            return Err(DdnsError::Config("DOMAINS is empty".to_string()));
        }
        if self.project_id.is_empty() {
            return Err(DdnsError::Config("PROJECT_ID is not set".to_string()));
        }
        if self.managed_zone.is_empty() {
            return Err(DdnsError::Config("MANAGED_ZONE is not set".to_string()));
        }
        Ok(())
    }

    /// Sleep between cycles.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.wait_in_minutes.saturating_mul(60))
    }
}

/// Split a comma-separated domain list, dropping blanks and keeping order.
///
/// Entries are lower-cased to match the names Cloud DNS returns.
pub fn parse_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}
