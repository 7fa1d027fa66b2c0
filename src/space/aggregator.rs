//! Space Accounting Aggregator
//!
//! Builds a [`SpaceInfo`] snapshot from the backend. When the service is
//! closed, or the backend cannot be reached, the snapshot is derived from
//! the configured storage areas instead.

use super::record::{
    AccessLatency, RetentionPolicy, SpaceInfo, SpaceRecord, VirtualFileSystemRecord,
};
use crate::config::Configuration;
use crate::domain::ports::{BackendGateway, VfsWithStatus};
use crate::error::Result;
use tracing::{debug, info, warn};

/// Builds space snapshots
pub struct SpaceInfoBuilder<'a> {
    configuration: &'a Configuration,
    gateway: &'a dyn BackendGateway,
}

impl<'a> SpaceInfoBuilder<'a> {
    pub fn new(configuration: &'a Configuration, gateway: &'a dyn BackendGateway) -> Self {
        Self {
            configuration,
            gateway,
        }
    }

    /// Build a fresh snapshot.
    ///
    /// Backend failures are logged and answered with the configuration
    /// fallback; only configuration and data errors are returned.
    pub async fn build(&self) -> Result<SpaceInfo> {
        if self.configuration.serving_state().is_closed() {
            info!("Service is closed, space info taken from configuration");
            return self.from_configuration();
        }

        match self.from_backend().await {
            Ok(info) => {
                debug!("Space info from backend: {}", info);
                Ok(info)
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "Unable to get space info from {}: {}. Falling back to configuration",
                    self.gateway.endpoint(),
                    e
                );
                self.from_configuration()
            }
            Err(e) => Err(e),
        }
    }

    async fn from_backend(&self) -> Result<SpaceInfo> {
        let list = self.gateway.vfs_list_with_status().await?;
        let records = list
            .into_iter()
            .map(|(name, entry)| vfs_from_backend(name, entry))
            .collect::<Result<Vec<_>>>()?;
        SpaceInfo::from_vfs(records)
    }

    /// Snapshot derived from the configured storage area sizes
    pub fn from_configuration(&self) -> Result<SpaceInfo> {
        let protocols = self.configuration.enabled_access_protocols();
        let records = self
            .configuration
            .storage_areas()?
            .iter()
            .map(|area| area.to_vfs_record(&protocols))
            .collect::<Vec<_>>();
        let info = SpaceInfo::from_vfs(records)?;
        debug!("Space info from configuration: {}", info);
        Ok(info)
    }
}

/// Convenience wrapper around [`SpaceInfoBuilder::build`]
pub async fn build(
    configuration: &Configuration,
    gateway: &dyn BackendGateway,
) -> Result<SpaceInfo> {
    SpaceInfoBuilder::new(configuration, gateway).build().await
}

fn vfs_from_backend(name: String, entry: VfsWithStatus) -> Result<VirtualFileSystemRecord> {
    let VfsWithStatus { descriptor, status } = entry;
    let retention_policy = descriptor
        .retention_policy
        .parse()
        .unwrap_or_else(|_| RetentionPolicy::from_storage_class(&descriptor.storage_class));
    let access_latency = descriptor
        .access_latency
        .parse()
        .unwrap_or_else(|_| AccessLatency::from_storage_class(&descriptor.storage_class));

    let space = SpaceRecord {
        total: status.total_space,
        available: status.available_space,
        used: status.used_space,
        free: status.free_space,
        unavailable: status.unavailable_space,
        reserved: status.reserved_space,
        busy: status.busy_space,
        nearline: descriptor.available_nearline_space,
    };
    debug!("{}: {}", name, space);

    Ok(VirtualFileSystemRecord {
        vos: descriptor.voname.to_vec(),
        name,
        token: descriptor.token,
        root: descriptor.root,
        storage_class: descriptor.storage_class,
        stfn_root: descriptor.stfn_root,
        retention_policy,
        access_latency,
        protocols: descriptor.protocols,
        approachable_rules: descriptor.approachable_rules,
        space,
    })
}
