//! StoRM Backend REST Adapter
//!
//! Implements [`BackendGateway`] against the backend's REST services.

use super::retry::{with_retry, RetryPolicy};
use crate::config::Configuration;
use crate::domain::ports::{decode_body, BackendGateway, SaStatus, SaStatusResponse, VfsDescriptor};
use crate::error::{Error, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the backend gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// REST endpoint, e.g. `http://storm-backend:9998`
    pub endpoint: String,
    /// Retry schedule for GET requests
    pub retry: RetryPolicy,
    /// TCP connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9998".to_string(),
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl GatewayConfig {
    /// Gateway settings for the backend named in the configuration
    pub fn from_configuration(configuration: &Configuration) -> Self {
        Self {
            endpoint: configuration.backend_rest_endpoint(),
            ..Default::default()
        }
    }
}

// =============================================================================
// StoRM Gateway
// =============================================================================

/// REST client for the StoRM backend
pub struct StormGateway {
    config: GatewayConfig,
    client: reqwest::Client,
}

impl StormGateway {
    /// Create a new gateway
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, client })
    }

    fn vfs_list_url(&self) -> String {
        format!("{}/configuration/1.3/VirtualFSList", self.config.endpoint)
    }

    fn status_url(&self, token: &str) -> String {
        format!(
            "{}/info/status/{}",
            self.config.endpoint,
            urlencoding::encode(token)
        )
    }

    /// Single GET, error statuses included in the failure
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::BackendStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Getting JSON from URL: {}", url);
        let body = with_retry(&self.config.retry, url, || self.fetch(url)).await?;
        decode_body(url, &body)
    }
}

#[async_trait]
impl BackendGateway for StormGateway {
    fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn vfs_list(&self) -> Result<IndexMap<String, VfsDescriptor>> {
        debug!("Retrieving backend configuration from {} ...", self.config.endpoint);
        self.get_json(&self.vfs_list_url()).await
    }

    async fn vfs_status(&self, token: &str) -> Result<SaStatus> {
        debug!("Getting space info for storage area {} ...", token);
        let response: SaStatusResponse = self.get_json(&self.status_url(token)).await?;
        Ok(response.sa_status)
    }

    async fn is_online(&self) -> bool {
        match self.client.head(self.vfs_list_url()).send().await {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                debug!("Backend probe failed: {}", e);
                false
            }
        }
    }
}
