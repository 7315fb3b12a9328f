//! # cloud-ddns
//!
//! A dynamic DNS updater for Google Cloud DNS written in Rust.
//!
//! ## Features
//!
//! - External IP discovery through an IP echo service
//! - Replaces the `A` record sets of several domains in one managed zone
//! - Status and error notifications to a chat webhook
//! - Daemon mode with a fixed interval between cycles
//!
//! ## Usage
//!
//! ```bash
//! export DOMAINS=home.example.com,vpn.example.com
//! export PROJECT_ID=my-project
//! export MANAGED_ZONE=example-zone
//! export WEBHOOK_URL=https://chat.googleapis.com/v1/spaces/...
//! export WAIT_IN_MINUTE=5
//!
//! # Run forever
//! cloud-ddns run
//!
//! # Single cycle
//! cloud-ddns once
//!
//! # Show current records without writing
//! cloud-ddns status
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod notifier;
pub mod providers;
pub mod reconcile;

pub use config::Config;
pub use detector::IpResolver;
pub use error::{DdnsError, Result};
pub use reconcile::Reconciler;
