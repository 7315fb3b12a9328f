//! Public IP detection.

use crate::config::DEFAULT_IP_SERVICE;
use crate::error::{DdnsError, Result};
use std::net::IpAddr;
use std::time::Duration;

/// Resolves the host's external address through an IP echo service.
pub struct IpResolver {
    client: reqwest::Client,
    service: String,
}

impl IpResolver {
    /// Create a resolver against the default echo service.
    pub fn new() -> Result<Self> {
        Self::with_service(DEFAULT_IP_SERVICE.to_string())
    }

    /// Create a resolver against a custom echo service.
    pub fn with_service(service: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, service })
    }

    /// The echo service URL.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Fetch the external IP address.
    ///
    /// Transport and body read failures are `Network` errors. A non-success
    /// status or a body that is not an IP address is an `IpDetection` error.
    pub async fn resolve_external_ip(&self) -> Result<IpAddr> {
        let response = self.client.get(&self.service).send().await?;

        if !response.status().is_success() {
            return Err(DdnsError::IpDetection(format!(
                "HTTP {} from {}",
                response.status(),
                self.service
            )));
        }

        let text = response.text().await?;
        let ip_str = text.trim();

        let ip = ip_str
            .parse()
            .map_err(|_| DdnsError::IpDetection(format!("Invalid IP response: {:?}", ip_str)))?;

        tracing::debug!("Resolved external IP {} from {}", ip, self.service);
        Ok(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_default_service() {
        let resolver = IpResolver::new().unwrap();
        assert_eq!(resolver.service(), "https://api.ipify.org");
    }

    #[tokio::test]
    async fn test_resolve_trims_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("5.6.7.8\n"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let resolver = IpResolver::with_service(format!("{}/", mock_server.uri())).unwrap();
        let ip = resolver.resolve_external_ip().await.unwrap();

        assert_eq!(ip, "5.6.7.8".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_ipv6() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("2001:db8::1"))
            .mount(&mock_server)
            .await;

        let resolver = IpResolver::with_service(mock_server.uri()).unwrap();
        let ip = resolver.resolve_external_ip().await.unwrap();

        assert!(ip.is_ipv6());
    }

    #[tokio::test]
    async fn test_resolve_rejects_garbage() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rate limited</html>"))
            .mount(&mock_server)
            .await;

        let resolver = IpResolver::with_service(mock_server.uri()).unwrap();
        let result = resolver.resolve_external_ip().await;

        assert!(matches!(result, Err(DdnsError::IpDetection(_))));
    }

    #[tokio::test]
    async fn test_resolve_rejects_empty_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        let resolver = IpResolver::with_service(mock_server.uri()).unwrap();
        assert!(resolver.resolve_external_ip().await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_http_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let resolver = IpResolver::with_service(mock_server.uri()).unwrap();
        let result = resolver.resolve_external_ip().await;

        assert!(matches!(result, Err(DdnsError::IpDetection(_))));
    }

    #[tokio::test]
    async fn test_resolve_connection_refused() {
        // Port 1 on localhost is never listening in test environments.
        let resolver = IpResolver::with_service("http://127.0.0.1:1/".to_string()).unwrap();
        let result = resolver.resolve_external_ip().await;

        assert!(matches!(result, Err(DdnsError::Network(_))));
    }
}
