//! Domain Ports - Boundary between space accounting and the backend
//!
//! The aggregator only talks to the backend through [`BackendGateway`].
//! The REST adapter lives in `crate::gateway`; tests provide stubs.

use crate::error::{Error, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

// =============================================================================
// Backend Payloads
// =============================================================================

/// VO binding of a storage area as published by the backend.
///
/// Older backends send a comma-separated string, newer ones a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VoNames {
    One(String),
    Many(Vec<String>),
}

impl VoNames {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            VoNames::One(value) => value
                .split(',')
                .map(str::trim)
                .filter(|vo| !vo.is_empty())
                .map(str::to_string)
                .collect(),
            VoNames::Many(values) => values.clone(),
        }
    }
}

impl Default for VoNames {
    fn default() -> Self {
        VoNames::Many(Vec::new())
    }
}

/// One entry of `/configuration/1.3/VirtualFSList`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VfsDescriptor {
    pub token: String,
    #[serde(default, alias = "vos")]
    pub voname: VoNames,
    #[serde(default)]
    pub root: String,
    #[serde(rename = "storageclass", default)]
    pub storage_class: String,
    #[serde(rename = "stfnRoot", default)]
    pub stfn_root: Vec<String>,
    #[serde(rename = "retentionPolicy")]
    pub retention_policy: String,
    #[serde(rename = "accessLatency")]
    pub access_latency: String,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(rename = "approachableRules", default)]
    pub approachable_rules: Vec<String>,
    #[serde(
        rename = "availableNearlineSpace",
        default,
        deserialize_with = "lenient_u64"
    )]
    pub available_nearline_space: u64,
}

/// Space counters of `/info/status/<token>`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SaStatus {
    #[serde(deserialize_with = "lenient_u64")]
    pub total_space: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub available_space: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub used_space: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub free_space: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub unavailable_space: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub reserved_space: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub busy_space: u64,
}

/// Envelope of the status response
#[derive(Debug, Clone, Deserialize)]
pub struct SaStatusResponse {
    #[serde(rename = "sa-status")]
    pub sa_status: SaStatus,
}

/// A descriptor together with its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsWithStatus {
    pub descriptor: VfsDescriptor,
    pub status: SaStatus,
}

/// Accept byte counters as JSON numbers or numeric strings
fn lenient_u64<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Float(f64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Float(f) if f >= 0.0 => Ok(f as u64),
        NumberOrString::Float(f) => Err(serde::de::Error::custom(format!(
            "negative byte counter: {}",
            f
        ))),
        NumberOrString::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid byte counter: {:?}", s))),
    }
}

// =============================================================================
// Backend Gateway Port
// =============================================================================

/// Read-only access to the storage backend
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Endpoint used in log messages
    fn endpoint(&self) -> &str;

    /// Fetch the configured virtual file systems, in backend order
    async fn vfs_list(&self) -> Result<IndexMap<String, VfsDescriptor>>;

    /// Fetch the space counters of one storage area
    async fn vfs_status(&self, token: &str) -> Result<SaStatus>;

    /// One list call plus one status call per storage area
    async fn vfs_list_with_status(&self) -> Result<IndexMap<String, VfsWithStatus>> {
        let list = self.vfs_list().await?;
        let mut result = IndexMap::with_capacity(list.len());
        for (name, descriptor) in list {
            debug!("retrieving space info data for {}", name);
            let status = self.vfs_status(&descriptor.token).await?;
            result.insert(name, VfsWithStatus { descriptor, status });
        }
        Ok(result)
    }

    /// Liveness probe, never retried
    async fn is_online(&self) -> bool;
}

/// Decode a backend body, mapping failures to [`Error::MalformedResponse`]
pub fn decode_body<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::MalformedResponse {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
