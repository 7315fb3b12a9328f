//! DNS record storage: the record-set model, the store seam, and the A record writer.

mod auth;
mod clouddns;


pub use auth::{MetadataToken, StaticToken, TokenSource};
pub use clouddns::CloudDnsStore;

use crate::config::Config;
use crate::error::{DdnsError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// TTL applied to every record set this crate writes.
pub const RECORD_TTL: u32 = 300;

/// Record type managed by this crate.
pub const RECORD_TYPE_A: &str = "A";

/// One DNS resource record set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecordSet {
    /// Owner name in FQDN form (trailing dot).
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub rrdatas: Vec<String>,
}

impl ResourceRecordSet {
    /// An `A` record set for `domain` with the fixed TTL.
    pub fn a_record(domain: &str, rrdatas: Vec<String>) -> Self {
        Self {
            name: fqdn(domain),
            record_type: RECORD_TYPE_A.to_string(),
            ttl: RECORD_TTL,
            rrdatas,
        }
    }
}

/// Atomic set of deletions and additions submitted to a zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deletions: Vec<ResourceRecordSet>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additions: Vec<ResourceRecordSet>,
}

impl Change {
    /// Replace whatever `A` values `domain` has with the single value `ip`.
    ///
    /// With no existing values the change is a pure addition.
    pub fn replace_a_record(domain: &str, existing: Vec<String>, ip: IpAddr) -> Self {
        let mut change = Change::default();

        if !existing.is_empty() {
            change
                .deletions
                .push(ResourceRecordSet::a_record(domain, existing));
        }
        change
            .additions
            .push(ResourceRecordSet::a_record(domain, vec![ip.to_string()]));

        change
    }
}

/// Append the trailing dot unless the name already has one.
pub fn fqdn(domain: &str) -> String {
    if domain.ends_with('.') {
        domain.to_string()
    } else {
        format!("{}.", domain)
    }
}

/// A managed zone whose record sets can be listed and changed.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Backend name, used in error messages.
    fn name(&self) -> &'static str;

    /// Human-readable zone identifier.
    fn zone(&self) -> String;

    /// List every record set in the zone, in provider order.
    async fn list_record_sets(&self) -> Result<Vec<ResourceRecordSet>>;

    /// Submit a change to the zone.
    async fn submit_change(&self, change: &Change) -> Result<()>;

    /// Values of the `A` record sets named `domain`, in provider order.
    ///
    /// Names compare case-insensitively. Returns an empty vector when the zone has no such record.
    async fn list_a_records(&self, domain: &str) -> Result<Vec<String>> {
        let name = fqdn(domain);
        let records = self
            .list_record_sets()
            .await?
            .into_iter()
            .filter(|rrset| {
                rrset.record_type == RECORD_TYPE_A && rrset.name.eq_ignore_ascii_case(&name)
            })
            .flat_map(|rrset| rrset.rrdatas)
            .collect();

        Ok(records)
    }
}

/// Point `domain` at `ip`, replacing all existing `A` values.
///
/// Every failure, credentials included, comes back as a `Provider` error.
/// Returns the change that was submitted.
pub async fn set_a_record(store: &dyn RecordStore, domain: &str, ip: IpAddr) -> Result<Change> {
    let existing = store
        .list_a_records(domain)
        .await
        .map_err(|e| as_provider_error(store, "failed to get existing A records", e))?;

    let change = Change::replace_a_record(domain, existing, ip);

    tracing::debug!(
        "Submitting change for {} in {}: {} deletion(s), {} addition(s)",
        domain,
        store.zone(),
        change.deletions.len(),
        change.additions.len()
    );

    store
        .submit_change(&change)
        .await
        .map_err(|e| as_provider_error(store, "failed to create DNS change", e))?;

    Ok(change)
}

fn as_provider_error(store: &dyn RecordStore, context: &str, e: DdnsError) -> DdnsError {
    match e {
        DdnsError::Provider { .. } => e,
        other => DdnsError::provider(store.name(), format!("{}: {}", context, other)),
    }
}

/// Create the Cloud DNS store described by the configuration.
pub fn create_store(config: &Config) -> Result<Box<dyn RecordStore>> {
    let tokens: Box<dyn TokenSource> = match &config.access_token {
        Some(token) => Box::new(StaticToken::new(token.clone())),
        None => Box::new(MetadataToken::new()?),
    };

    Ok(Box::new(CloudDnsStore::with_base_url(
        config.project_id.clone(),
        config.managed_zone.clone(),
        tokens,
        config.api_base_url.clone(),
    )?))
}
