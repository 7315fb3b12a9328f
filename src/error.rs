//! Error types for cloud-ddns.

use thiserror::Error;

/// Result type alias for cloud-ddns.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP error.
    #[error("Network error: {0}")]
    Network(String),

    /// Credential or token acquisition error.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Provider-specific error.
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    /// Webhook rejected the notification.
    #[error("Notification failed: {0}")]
    Notify(String),

    /// IP detection error.
    #[error("IP detection failed: {0}")]
    IpDetection(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DdnsError {
    /// Shorthand for a provider error.
    pub fn provider(provider: &str, message: impl Into<String>) -> Self {
        DdnsError::Provider {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}
