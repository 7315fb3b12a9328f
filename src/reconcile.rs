//! Reconciliation of configured domains against the external IP.
//!
//! One cycle resolves the IP once, then walks the domains strictly in order:
//! read the current `A` values, compare, and replace them when they differ
//! or are missing. Every failure is reported through the notifier and the
//! cycle moves on; nothing is retried until the next cycle.

use crate::detector::IpResolver;
use crate::error::Result;
use crate::notifier::{notify_best_effort, Notifier};
use crate::providers::{set_a_record, Change, RecordStore};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How a domain's current `A` values relate to the desired IP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    /// The zone has no `A` record for the domain.
    NoExistingRecord,
    /// The first value already equals the desired IP.
    Matches,
    /// The first value is something else.
    Differs { current: String },
}

impl Comparison {
    /// Whether a write is required.
    pub fn needs_update(&self) -> bool {
        !matches!(self, Comparison::Matches)
    }
}

/// Compare the first existing value with `ip`.
pub fn compare(existing: &[String], ip: IpAddr) -> Comparison {
    match existing.first() {
        None => Comparison::NoExistingRecord,
        Some(current) if current.trim().parse::<IpAddr>().ok() == Some(ip) => Comparison::Matches,
        Some(current) => Comparison::Differs {
            current: current.clone(),
        },
    }
}

/// Result of reconciling one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainOutcome {
    /// Already pointing at the IP; nothing written.
    Unchanged,
    /// A change was submitted.
    Updated { change: Change },
    /// Existing records could not be read; nothing written.
    ReadFailed { error: String },
    /// The write was attempted and failed.
    WriteFailed { error: String },
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub ip: IpAddr,
    pub outcomes: Vec<(String, DomainOutcome)>,
}

impl CycleReport {
    /// Number of domains a change was submitted for.
    pub fn updated(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, DomainOutcome::Updated { .. }))
            .count()
    }

    /// Whether every domain was read and, if needed, written.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    /// Number of domains that failed to read or write.
    pub fn failed(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| {
                matches!(
                    o,
                    DomainOutcome::ReadFailed { .. } | DomainOutcome::WriteFailed { .. }
                )
            })
            .count()
    }
}

/// Drives reconciliation cycles for a fixed set of domains.
pub struct Reconciler {
    resolver: IpResolver,
    store: Box<dyn RecordStore>,
    notifier: Box<dyn Notifier>,
    domains: Vec<String>,
    interval: Duration,
}

impl Reconciler {
    pub fn new(
        resolver: IpResolver,
        store: Box<dyn RecordStore>,
        notifier: Box<dyn Notifier>,
        domains: Vec<String>,
        interval: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            notifier,
            domains,
            interval,
        }
    }

    /// Run one cycle.
    ///
    /// An IP resolution failure is notified once and returned; no domain is
    /// touched in that case. Per-domain failures are notified and recorded in
    /// the report.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();

        let ip = match self.resolver.resolve_external_ip().await {
            Ok(ip) => ip,
            Err(e) => {
                error!("Failed to resolve external IP: {}", e);
                notify_best_effort(self.notifier.as_ref(), &e.to_string()).await;
                return Err(e);
            }
        };

        let mut outcomes = Vec::with_capacity(self.domains.len());
        for domain in &self.domains {
            let outcome = self.reconcile_domain(domain, ip).await;
            outcomes.push((domain.clone(), outcome));
        }

        Ok(CycleReport {
            started_at,
            ip,
            outcomes,
        })
    }

    async fn reconcile_domain(&self, domain: &str, ip: IpAddr) -> DomainOutcome {
        let existing = match self.store.list_a_records(domain).await {
            Ok(existing) => existing,
            Err(e) => {
                error!("Failed to read A records for {}: {}", domain, e);
                notify_best_effort(self.notifier.as_ref(), &e.to_string()).await;
                return DomainOutcome::ReadFailed {
                    error: e.to_string(),
                };
            }
        };

        match compare(&existing, ip) {
            Comparison::Matches => {
                info!("A records for {} already set to {}", domain, ip);
                return DomainOutcome::Unchanged;
            }
            Comparison::NoExistingRecord => {
                debug!("No A record for {}, creating one", domain);
            }
            Comparison::Differs { current } => {
                debug!("A record for {} is {}, replacing", domain, current);
            }
        }

        let message = format!("Setting A records for {} to {}", domain, ip);
        info!("{}", message);
        notify_best_effort(self.notifier.as_ref(), &message).await;

        match set_a_record(self.store.as_ref(), domain, ip).await {
            Ok(change) => DomainOutcome::Updated { change },
            Err(e) => {
                error!("Failed to set A records for {}: {}", domain, e);
                notify_best_effort(self.notifier.as_ref(), &e.to_string()).await;
                DomainOutcome::WriteFailed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run cycles forever, sleeping the configured interval between them.
    ///
    /// A cycle whose IP resolution failed is skipped; the loop carries on
    /// after the usual sleep. `shutdown` is only observed between cycles.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            "Reconciling {} domain(s) in {} every {}s",
            self.domains.len(),
            self.store.zone(),
            self.interval.as_secs()
        );

        loop {
            match self.run_cycle().await {
                Ok(report) => info!(
                    "Cycle for {} finished: {} updated, {} failed",
                    report.ip,
                    report.updated(),
                    report.failed()
                ),
                Err(e) => warn!("Cycle skipped: {}", e),
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping reconciliation loop");
                    return;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
