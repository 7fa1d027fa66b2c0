//! Storage Service Report
//!
//! JSON summary of the service, its shares and its endpoints, written next
//! to the static LDIF files.

use crate::config::{Configuration, QualityLevel, ServingState};
use crate::error::{Error, Result};
use crate::space::{AccessLatency, RetentionPolicy, SpaceInfo};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::info;

const CAPABILITIES: &[&str] = &["data.management.transfer", "data.management.storage"];

/// Endpoint entry of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageEndpoint {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    pub version: String,
    pub capabilities: Vec<String>,
    pub quality_level: QualityLevel,
}

/// Share entry of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageShare {
    pub name: String,
    pub vos: Vec<String>,
    pub total_size: u64,
    pub used_size: u64,
    pub paths: Vec<String>,
    pub access_latency: AccessLatency,
    pub retention_policy: RetentionPolicy,
    pub serving_state: ServingState,
    /// Seconds since the epoch
    pub timestamp: i64,
    pub assigned_endpoints: Vec<String>,
}

/// The whole report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageServiceReport {
    pub name: String,
    pub implementation: String,
    pub version: String,
    pub quality_level: QualityLevel,
    /// Seconds since the epoch
    pub latest_update: i64,
    pub capabilities: Vec<String>,
    pub endpoints: Vec<StorageEndpoint>,
    pub shares: Vec<StorageShare>,
}

impl StorageServiceReport {
    /// Describe the service as of `now`
    pub fn build(
        configuration: &Configuration,
        space: &SpaceInfo,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let site = configuration.site_name();
        let quality_level = configuration.quality_level();
        let timestamp = now.timestamp();
        let capabilities: Vec<String> = CAPABILITIES.iter().map(|c| c.to_string()).collect();

        let shares = space
            .vfs
            .values()
            .map(|vfs| StorageShare {
                name: vfs.name.clone(),
                vos: vfs.vos.clone(),
                total_size: vfs.space.total,
                used_size: vfs.space.used,
                paths: vfs.stfn_root.clone(),
                access_latency: vfs.access_latency,
                retention_policy: vfs.retention_policy,
                serving_state: configuration.serving_state(),
                timestamp,
                assigned_endpoints: vec!["all".to_string()],
            })
            .collect();

        let endpoint = |suffix: &str, url: String, interface_type: &str, version: &str| StorageEndpoint {
            name: format!("{}_{}", site, suffix),
            url,
            interface_type: interface_type.to_string(),
            version: version.to_string(),
            capabilities: capabilities.clone(),
            quality_level,
        };

        let mut endpoints = vec![endpoint("srm", configuration.public_srm_endpoint(), "srm", "2.2")];
        if configuration.has_gridhttps() {
            endpoints.push(endpoint("http", configuration.public_http_endpoint()?, "DAV", "1.1"));
            endpoints.push(endpoint("https", configuration.public_https_endpoint()?, "DAV", "1.1"));
        }

        Ok(Self {
            name: site.to_string(),
            implementation: "storm".to_string(),
            version: configuration.implementation_version().to_string(),
            quality_level,
            latest_update: timestamp,
            capabilities,
            endpoints,
            shares,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON
    pub async fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| Error::file_system(path, e))?;
        info!("Exported JSON report to {}", path.display());
        Ok(())
    }
}
