//! HTTP transport used for health probes and webhook delivery.

use crate::errors::{DeployResult, DeployflowError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Minimal HTTP surface the pipeline needs.
///
/// Implementations return the response status code; transport failures
/// (DNS, connect, timeout) are errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issues a GET and returns the status code.
    async fn get(&self, url: &str) -> DeployResult<u16>;

    /// POSTs a JSON body and returns the status code.
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> DeployResult<u16>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Per-request timeout applied by [`ReqwestTransport::new`].
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a transport with the default timeout.
    pub fn new() -> DeployResult<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    /// Creates a transport with a custom request timeout.
    pub fn with_timeout(timeout: Duration) -> DeployResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("deployflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DeployflowError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> DeployResult<u16> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DeployflowError::http(url, e.to_string()))?;
        Ok(response.status().as_u16())
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> DeployResult<u16> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| DeployflowError::http(url, e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

/// Logs requests instead of sending them and answers 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunTransport;

impl DryRunTransport {
    /// Creates a dry-run transport.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HttpTransport for DryRunTransport {
    async fn get(&self, url: &str) -> DeployResult<u16> {
        info!(url, "[dry-run] would GET");
        Ok(200)
    }

    async fn post_json(&self, _url: &str, body: &serde_json::Value) -> DeployResult<u16> {
        // Webhook URLs carry credentials; only the body is logged.
        info!(body = %body, "[dry-run] would POST");
        Ok(200)
    }
}

/// Returns true for 2xx status codes.
#[must_use]
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_success_status() {
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(!is_success_status(301));
        assert!(!is_success_status(503));
    }

    #[test]
    fn test_transport_builds() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_answers_ok() {
        let transport = DryRunTransport::new();
        assert_eq!(transport.get("http://10.0.0.1/health").await.unwrap(), 200);
        assert_eq!(
            transport
                .post_json("https://hooks.example.com/x", &serde_json::json!({"text": "hi"}))
                .await
                .unwrap(),
            200
        );
    }
}
