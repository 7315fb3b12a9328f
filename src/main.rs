//! cloud-ddns - Dynamic DNS updater for Google Cloud DNS.

use clap::{Parser, Subcommand};
use cloud_ddns::config::Config;
use cloud_ddns::detector::IpResolver;
use cloud_ddns::notifier::create_notifier;
use cloud_ddns::providers::create_store;
use cloud_ddns::reconcile::{compare, Comparison, DomainOutcome, Reconciler};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cloud-ddns")]
#[command(about = "Keep Cloud DNS A records pointed at this host's public IP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile forever, sleeping WAIT_IN_MINUTE between cycles (default)
    Run,

    /// Run a single reconciliation cycle
    Once,

    /// Show the current IP and records without writing
    Status,

    /// Validate configuration and zone access
    Validate,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => cmd_run(config).await,
        Commands::Once => cmd_once(config).await,
        Commands::Status => cmd_status(config).await,
        Commands::Validate => cmd_validate(config).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn build_reconciler(config: &Config) -> anyhow::Result<Reconciler> {
    let resolver = IpResolver::with_service(config.ip_service_url.clone())?;

    Ok(Reconciler::new(
        resolver,
        create_store(config)?,
        create_notifier(config.webhook_url.as_deref())?,
        config.domains.clone(),
        config.interval(),
    ))
}

async fn cmd_run(config: Config) -> anyhow::Result<ExitCode> {
    let reconciler = build_reconciler(&config)?;
    reconciler.run(shutdown_signal()).await;
    Ok(ExitCode::SUCCESS)
}

async fn cmd_once(config: Config) -> anyhow::Result<ExitCode> {
    let reconciler = build_reconciler(&config)?;
    let report = reconciler.run_cycle().await?;

    println!("External IP: {}", report.ip);
    for (domain, outcome) in &report.outcomes {
        match outcome {
            DomainOutcome::Unchanged => println!("  {}: unchanged", domain),
            DomainOutcome::Updated { change } => {
                let previous: Vec<&str> = change
                    .deletions
                    .iter()
                    .flat_map(|r| r.rrdatas.iter().map(String::as_str))
                    .collect();
                if previous.is_empty() {
                    println!("  {}: created", domain);
                } else {
                    println!("  {}: updated (was {})", domain, previous.join(", "));
                }
            }
            DomainOutcome::ReadFailed { error } | DomainOutcome::WriteFailed { error } => {
                println!("  {}: FAILED - {}", domain, error)
            }
        }
    }

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

async fn cmd_status(config: Config) -> anyhow::Result<ExitCode> {
    let resolver = IpResolver::with_service(config.ip_service_url.clone())?;
    let store = create_store(&config)?;

    println!("cloud-ddns Status");
    println!("=================\n");
    println!("Zone: {}", store.zone());

    let ip = match resolver.resolve_external_ip().await {
        Ok(ip) => {
            println!("Current Public IP: {}", ip);
            Some(ip)
        }
        Err(e) => {
            println!("Failed to detect IP: {}", e);
            None
        }
    };

    println!("\nDomains:");
    println!("--------");

    for domain in &config.domains {
        match store.list_a_records(domain).await {
            Ok(records) => {
                let state = match ip.map(|ip| compare(&records, ip)) {
                    Some(Comparison::Matches) => "up to date",
                    Some(Comparison::Differs { .. }) => "stale",
                    Some(Comparison::NoExistingRecord) => "missing",
                    None => "unknown",
                };
                let values = if records.is_empty() {
                    "(no record)".to_string()
                } else {
                    records.join(", ")
                };
                println!("  {}: {} [{}]", domain, values, state);
            }
            Err(e) => println!("  {}: error: {}", domain, e),
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn cmd_validate(config: Config) -> anyhow::Result<ExitCode> {
    println!("Validating configuration...\n");

    let store = create_store(&config)?;
    let mut all_valid = true;

    for domain in &config.domains {
        print!("  {}: ", domain);

        match store.list_a_records(domain).await {
            Ok(_) => println!("OK"),
            Err(e) => {
                println!("FAILED - {}", e);
                all_valid = false;
            }
        }
    }

    println!();

    if all_valid {
        println!("All domains validated successfully.");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Some domains failed validation.");
        Ok(ExitCode::FAILURE)
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
