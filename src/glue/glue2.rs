//! GLUE 2 Mapper
//!
//! Publishes the storage service with its capacities, access protocols,
//! manager and data stores, one share per VFS with mapping policy and
//! capacities, and the SRM and WebDAV endpoints with their access policies.

use super::units::as_gigabytes;
use super::GlueSchema;
use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::ldif::{Attributes, DirectoryRecord};
use crate::space::{SpaceInfo, SpaceRecord, VirtualFileSystemRecord};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Base DN of every GLUE 2 record
pub const GLUE2_BASE_DN: &str = "GLUE2GroupID=resource,o=glue";

const CREATION_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Version published for an access protocol
fn access_protocol_version(protocol: &str) -> &'static str {
    match protocol {
        "http" | "https" => "1.1.0",
        "gsiftp" => "2.0.0",
        "webdav" => "1.1",
        _ => "1.0.0",
    }
}

/// Kind of a published capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapacityType {
    Online,
    Nearline,
}

impl CapacityType {
    fn as_str(&self) -> &'static str {
        match self {
            CapacityType::Online => "online",
            CapacityType::Nearline => "nearline",
        }
    }

    /// Capacities to publish for a record; empty ones are left out
    fn present_in(space: &SpaceRecord) -> Vec<CapacityType> {
        let mut types = Vec::with_capacity(2);
        if space.has_online_capacity() {
            types.push(CapacityType::Online);
        }
        if space.has_nearline_capacity() {
            types.push(CapacityType::Nearline);
        }
        types
    }
}

/// Endpoint kinds with their id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointKind {
    Http,
    Https,
}

impl EndpointKind {
    fn from_url(url: &str) -> Result<Self> {
        let parsed = reqwest::Url::parse(url).map_err(|e| {
            Error::Configuration(format!("invalid WebDAV endpoint {}: {}", url, e))
        })?;
        match parsed.scheme() {
            "http" => Ok(EndpointKind::Http),
            "https" => Ok(EndpointKind::Https),
            _ => Err(Error::Configuration(format!(
                "unable to read a valid protocol from {}",
                url
            ))),
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            EndpointKind::Http => "HTTP",
            EndpointKind::Https => "HTTPS",
        }
    }
}

/// A published HTTP(S) endpoint
struct WebEndpoint {
    id: String,
    url: String,
}

// =============================================================================
// Mapper
// =============================================================================

/// GLUE 2 dialect
pub struct Glue2<'a> {
    configuration: &'a Configuration,
    created_at: DateTime<Utc>,
}

impl<'a> Glue2<'a> {
    pub fn new(configuration: &'a Configuration, created_at: DateTime<Utc>) -> Self {
        Self {
            configuration,
            created_at,
        }
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    pub fn service_id(&self) -> String {
        format!("{}/storage", self.configuration.backend_hostname())
    }

    fn manager_id(&self) -> String {
        format!("{}/manager", self.service_id())
    }

    fn srm_endpoint_id(&self) -> String {
        format!("{}/endpoint/SRM0", self.service_id())
    }

    fn web_endpoint_id(&self, kind: EndpointKind, index: usize) -> String {
        format!("{}/endpoint/{}{}", self.service_id(), kind.id_prefix(), index)
    }

    fn service_capacity_id(&self, capacity: CapacityType) -> String {
        format!("{}/capacity/{}", self.service_id(), capacity.as_str())
    }

    fn access_protocol_id(&self, protocol: &str, version: &str) -> String {
        format!("{}/accessprotocol/{}/{}", self.service_id(), protocol, version)
    }

    fn data_store_id(&self, kind: &str) -> String {
        format!("{}/datastore/{}", self.service_id(), kind)
    }

    fn share_id(&self, vfs: &VirtualFileSystemRecord) -> String {
        format!("{}/share/{}", self.service_id(), vfs.short_name().to_lowercase())
    }

    fn share_capacity_id(&self, vfs: &VirtualFileSystemRecord, capacity: CapacityType) -> String {
        format!("{}/capacity/{}", self.share_id(vfs), capacity.as_str())
    }

    // =========================================================================
    // Distinguished Names
    // =========================================================================

    fn service_dn(&self) -> String {
        format!("GLUE2ServiceID={},{}", self.service_id(), GLUE2_BASE_DN)
    }

    fn child_dn(&self, attribute: &str, id: &str) -> String {
        format!("{}={},{}", attribute, id, self.service_dn())
    }

    fn service_capacity_dn(&self, capacity: CapacityType) -> String {
        self.child_dn("GLUE2StorageServiceCapacityID", &self.service_capacity_id(capacity))
    }

    fn endpoint_dn(&self, endpoint_id: &str) -> String {
        self.child_dn("GLUE2EndpointID", endpoint_id)
    }

    fn share_dn(&self, vfs: &VirtualFileSystemRecord) -> String {
        self.child_dn("GLUE2ShareID", &self.share_id(vfs))
    }

    fn share_capacity_dn(&self, vfs: &VirtualFileSystemRecord, capacity: CapacityType) -> String {
        format!(
            "GLUE2StorageShareCapacityID={},{}",
            self.share_capacity_id(vfs, capacity),
            self.share_dn(vfs)
        )
    }

    // =========================================================================
    // Object Classes
    // =========================================================================

    fn created(&self) -> Attributes {
        Attributes::new().with(
            "GLUE2EntityCreationTime",
            self.created_at.format(CREATION_TIME_FORMAT).to_string(),
        )
    }

    fn storage_service(&self) -> DirectoryRecord {
        DirectoryRecord::new(
            self.service_dn(),
            self.created()
                .with("objectClass", ["GLUE2Service", "GLUE2StorageService"])
                .with("GLUE2ServiceID", self.service_id())
                .with("GLUE2ServiceType", "storm")
                .with("GLUE2ServiceCapability", "data.management.storage")
                .with("GLUE2EntityOtherInfo", ["ProfileName=EGI", "ProfileVersion=1.0"]),
        )
    }

    fn service_capacity(&self, capacity: CapacityType) -> DirectoryRecord {
        let id = self.service_capacity_id(capacity);
        DirectoryRecord::new(
            self.service_capacity_dn(capacity),
            self.created()
                .with("GLUE2StorageServiceCapacityID", id)
                .with("objectClass", "GLUE2StorageServiceCapacity")
                .with("GLUE2StorageServiceCapacityStorageServiceForeignKey", self.service_id()),
        )
    }

    fn access_protocol(&self, id: &str) -> DirectoryRecord {
        DirectoryRecord::new(
            self.child_dn("GLUE2StorageAccessProtocolID", id),
            self.created()
                .with("GLUE2StorageAccessProtocolID", id)
                .with("objectClass", "GLUE2StorageAccessProtocol")
                .with("GLUE2StorageAccessProtocolStorageServiceForeignKey", self.service_id()),
        )
    }

    fn storage_manager(&self) -> DirectoryRecord {
        let manager_id = self.manager_id();
        DirectoryRecord::new(
            self.child_dn("GLUE2ManagerID", &manager_id),
            self.created()
                .with("GLUE2ManagerID", manager_id)
                .with("objectClass", ["GLUE2Manager", "GLUE2StorageManager"])
                .with("GLUE2ManagerProductName", "StoRM")
                .with("GLUE2StorageManagerStorageServiceForeignKey", self.service_id())
                .with("GLUE2ManagerServiceForeignKey", self.service_id()),
        )
    }

    fn data_store(&self, kind: &str) -> DirectoryRecord {
        let manager_id = self.manager_id();
        let id = self.data_store_id(kind);
        DirectoryRecord::new(
            format!(
                "GLUE2ResourceID={},{}",
                id,
                self.child_dn("GLUE2ManagerID", &manager_id)
            ),
            self.created()
                .with("GLUE2ResourceID", id)
                .with("objectClass", ["GLUE2DataStore", "GLUE2Resource"])
                .with("GLUE2ResourceManagerForeignKey", manager_id.as_str())
                .with("GLUE2DataStoreStorageManagerForeignKey", manager_id),
        )
    }

    fn storage_share(&self, vfs: &VirtualFileSystemRecord) -> DirectoryRecord {
        DirectoryRecord::new(
            self.share_dn(vfs),
            self.created()
                .with("GLUE2ShareID", self.share_id(vfs))
                .with("objectClass", ["GLUE2Share", "GLUE2StorageShare"])
                .with("GLUE2StorageShareExpirationMode", "neverexpire")
                .with("GLUE2StorageShareStorageServiceForeignKey", self.service_id())
                .with("GLUE2ShareServiceForeignKey", self.service_id()),
        )
    }

    fn mapping_policy(&self, vfs: &VirtualFileSystemRecord) -> DirectoryRecord {
        let share_id = self.share_id(vfs);
        let policy_id = format!("{}/mappingpolicy", share_id);
        DirectoryRecord::new(
            format!("GLUE2PolicyID={},{}", policy_id, self.share_dn(vfs)),
            self.created()
                .with("GLUE2PolicyID", policy_id)
                .with("objectClass", ["GLUE2Policy", "GLUE2MappingPolicy"])
                .with("GLUE2PolicyScheme", "basic")
                .with("GLUE2MappingPolicyShareForeignKey", share_id),
        )
    }

    fn share_capacity(&self, vfs: &VirtualFileSystemRecord, capacity: CapacityType) -> DirectoryRecord {
        DirectoryRecord::new(
            self.share_capacity_dn(vfs, capacity),
            Attributes::new()
                .with("GLUE2StorageShareCapacityID", self.share_capacity_id(vfs, capacity))
                .with(
                    "GLUE2EntityCreationTime",
                    self.created_at.format(CREATION_TIME_FORMAT).to_string(),
                )
                .with("objectClass", "GLUE2StorageShareCapacity")
                .with("GLUE2StorageShareCapacityStorageShareForeignKey", self.share_id(vfs)),
        )
    }

    fn endpoint(
        &self,
        endpoint_id: &str,
        interface: (&str, &str, &str),
        capabilities: &[&str],
    ) -> DirectoryRecord {
        let (name, version, semantics) = interface;
        DirectoryRecord::new(
            self.endpoint_dn(endpoint_id),
            self.created()
                .with("objectClass", ["GLUE2Endpoint", "GLUE2StorageEndpoint"])
                .with("GLUE2EndpointID", endpoint_id)
                .with("GLUE2EndpointImplementationName", "StoRM")
                .with("GLUE2EndpointHealthState", "ok")
                .with("GLUE2EndpointInterfaceName", name)
                .with("GLUE2EndpointInterfaceVersion", version)
                .with("GLUE2EndpointSemantics", semantics)
                .with("GLUE2EndpointTechnology", "webservice")
                .with("GLUE2EndpointCapability", capabilities.to_vec())
                .with("GLUE2EndpointServiceForeignKey", self.service_id())
                .with("GLUE2StorageEndpointStorageServiceForeignKey", self.service_id()),
        )
    }

    fn access_policy(&self, endpoint_id: &str) -> DirectoryRecord {
        let policy_id = format!("{}_Policy", endpoint_id);
        DirectoryRecord::new(
            format!("GLUE2PolicyID={},{}", policy_id, self.endpoint_dn(endpoint_id)),
            self.created()
                .with("GLUE2PolicyID", policy_id)
                .with("objectClass", ["GLUE2Policy", "GLUE2AccessPolicy"])
                .with("GLUE2PolicyScheme", "org.glite.standard")
                .with("GLUE2AccessPolicyEndpointForeignKey", endpoint_id),
        )
    }

    // =========================================================================
    // Attribute Sets
    // =========================================================================

    fn service_capacity_sizes(summary: &SpaceRecord, capacity: CapacityType) -> Attributes {
        match capacity {
            CapacityType::Online => Attributes::new()
                .with("GLUE2StorageServiceCapacityTotalSize", as_gigabytes(summary.total))
                .with("GLUE2StorageServiceCapacityFreeSize", as_gigabytes(summary.free))
                .with("GLUE2StorageServiceCapacityUsedSize", as_gigabytes(summary.used))
                .with("GLUE2StorageServiceCapacityReservedSize", as_gigabytes(summary.reserved)),
            CapacityType::Nearline => Attributes::new()
                .with("GLUE2StorageServiceCapacityTotalSize", as_gigabytes(summary.nearline))
                .with("GLUE2StorageServiceCapacityFreeSize", as_gigabytes(summary.nearline))
                .with("GLUE2StorageServiceCapacityUsedSize", 0u64)
                .with("GLUE2StorageServiceCapacityReservedSize", 0u64),
        }
    }

    fn share_capacity_sizes(space: &SpaceRecord, capacity: CapacityType) -> Attributes {
        match capacity {
            CapacityType::Online => Attributes::new()
                .with("GLUE2StorageShareCapacityTotalSize", as_gigabytes(space.total))
                .with("GLUE2StorageShareCapacityFreeSize", as_gigabytes(space.free))
                .with("GLUE2StorageShareCapacityUsedSize", as_gigabytes(space.used))
                .with("GLUE2StorageShareCapacityReservedSize", as_gigabytes(space.reserved)),
            CapacityType::Nearline => Attributes::new()
                .with("GLUE2StorageShareCapacityTotalSize", as_gigabytes(space.nearline))
                .with("GLUE2StorageShareCapacityFreeSize", as_gigabytes(space.nearline))
                .with("GLUE2StorageShareCapacityUsedSize", 0u64)
                .with("GLUE2StorageShareCapacityReservedSize", 0u64),
        }
    }

    fn endpoint_attributes(&self, url: &str) -> Attributes {
        let mut attributes = Attributes::new()
            .with("GLUE2EndpointURL", url)
            .with("GLUE2EndpointImplementationVersion", self.configuration.implementation_version())
            .with("GLUE2EndpointQualityLevel", self.configuration.quality_level().as_str())
            .with("GLUE2EndpointServingState", self.configuration.serving_state().as_str());
        if let Some(issuer_ca) = self.configuration.issuer_ca() {
            attributes.set("GLUE2EndpointIssuerCA", issuer_ca);
        }
        attributes
    }

    fn access_policy_attributes(&self) -> Result<Attributes> {
        let used_vos = self.configuration.used_vos()?;
        let rules: Vec<String> = used_vos.iter().map(|vo| format!("vo:{}", vo)).collect();
        Ok(Attributes::new()
            .with("GLUE2PolicyRule", rules)
            .with("GLUE2PolicyUserDomainForeignKey", used_vos))
    }

    /// WebDAV endpoints from the pool list, or the legacy GridHTTPS pair
    fn web_endpoints(&self) -> Result<Vec<WebEndpoint>> {
        if self.configuration.has_webdav() {
            return self
                .configuration
                .webdav_endpoints()
                .into_iter()
                .enumerate()
                .map(|(index, url)| {
                    let kind = EndpointKind::from_url(&url)?;
                    Ok(WebEndpoint {
                        id: self.web_endpoint_id(kind, index),
                        url,
                    })
                })
                .collect();
        }
        if self.configuration.has_gridhttps() {
            return Ok(vec![
                WebEndpoint {
                    id: self.web_endpoint_id(EndpointKind::Http, 0),
                    url: self.configuration.public_http_endpoint()?,
                },
                WebEndpoint {
                    id: self.web_endpoint_id(EndpointKind::Https, 0),
                    url: self.configuration.public_https_endpoint()?,
                },
            ]);
        }
        Ok(Vec::new())
    }

    fn share_records(&self, vfs: &VirtualFileSystemRecord) -> Vec<DirectoryRecord> {
        let mut records = Vec::new();

        let mut share = Attributes::new()
            .with("GLUE2StorageShareAccessLatency", vfs.access_latency.as_str())
            .with("GLUE2StorageShareRetentionPolicy", vfs.retention_policy.as_str())
            .with("GLUE2StorageShareServingState", self.configuration.serving_state().as_str())
            .with("GLUE2StorageSharePath", vfs.primary_path());
        let mut policy = Attributes::new().with("GLUE2PolicyRule", vfs.approachable_rules.as_slice());

        if vfs.is_anonymous() {
            share.set("GLUE2StorageShareSharingID", "dedicated");
        } else {
            share
                .set(
                    "GLUE2StorageShareSharingID",
                    format!(
                        "{}:{}:{}",
                        vfs.short_name().to_lowercase(),
                        vfs.retention_policy,
                        vfs.access_latency
                    ),
                )
                .set("GLUE2StorageShareTag", vfs.vos.as_slice())
                .set("GLUE2ShareDescription", format!("Share for {}", vfs.vos.join(",")));
            policy.set("GLUE2PolicyUserDomainForeignKey", vfs.vos.as_slice());
        }

        records.push(self.storage_share(vfs).initialized(share));
        records.push(self.mapping_policy(vfs).initialized(policy));

        for capacity in CapacityType::present_in(&vfs.space) {
            records.push(
                self.share_capacity(vfs, capacity).initialized(
                    Attributes::new()
                        .with("GLUE2StorageShareCapacityType", capacity.as_str())
                        .merged(Self::share_capacity_sizes(&vfs.space, capacity)),
                ),
            );
        }
        records
    }

    fn endpoint_patches(&self) -> Result<Vec<DirectoryRecord>> {
        let serving_state = self.configuration.serving_state().as_str();
        let mut ids = vec![self.srm_endpoint_id()];
        ids.extend(self.web_endpoints()?.into_iter().map(|e| e.id));
        Ok(ids
            .into_iter()
            .map(|id| {
                DirectoryRecord::patch(self.endpoint_dn(&id))
                    .with(Attributes::new().with("GLUE2EndpointServingState", serving_state))
            })
            .collect())
    }
}

impl GlueSchema for Glue2<'_> {
    fn name(&self) -> &'static str {
        "glue2"
    }

    fn static_ldif_file_name(&self) -> &'static str {
        "storm-glue2-static.ldif"
    }

    fn static_records(&self, space: &SpaceInfo) -> Result<Vec<DirectoryRecord>> {
        let summary = &space.summary;
        let version = self.configuration.implementation_version();
        let mut records = Vec::new();

        records.push(self.storage_service().initialized(
            Attributes::new()
                .with("GLUE2ServiceQualityLevel", self.configuration.quality_level().as_str())
                .with("GLUE2ServiceAdminDomainForeignKey", self.configuration.site_name()),
        ));

        for capacity in CapacityType::present_in(summary) {
            records.push(
                self.service_capacity(capacity).initialized(
                    Attributes::new()
                        .with("GLUE2StorageServiceCapacityType", capacity.as_str())
                        .merged(Self::service_capacity_sizes(summary, capacity)),
                ),
            );
        }

        for protocol in self.configuration.enabled_access_protocols() {
            let protocol_version = access_protocol_version(&protocol);
            let id = self.access_protocol_id(&protocol, protocol_version);
            records.push(
                self.access_protocol(&id).initialized(
                    Attributes::new()
                        .with("GLUE2StorageAccessProtocolType", protocol.as_str())
                        .with("GLUE2StorageAccessProtocolVersion", protocol_version),
                ),
            );
        }

        records.push(
            self.storage_manager()
                .initialized(Attributes::new().with("GLUE2ManagerProductVersion", version)),
        );

        for capacity in CapacityType::present_in(summary) {
            let (kind, total) = match capacity {
                CapacityType::Online => ("disk", summary.total),
                CapacityType::Nearline => ("tape", summary.nearline),
            };
            records.push(
                self.data_store(kind).initialized(
                    Attributes::new()
                        .with("GLUE2DataStoreType", kind)
                        .with("GLUE2DataStoreLatency", capacity.as_str())
                        .with("GLUE2DataStoreTotalSize", as_gigabytes(total)),
                ),
            );
        }

        for vfs in space.vfs.values() {
            records.extend(self.share_records(vfs));
        }

        let srm_id = self.srm_endpoint_id();
        records.push(
            self.endpoint(
                &srm_id,
                ("SRM", "2.2.0", "http://sdm.lbl.gov/srm-wg/doc/SRM.v2.2.html"),
                &["data.management.transfer", "data.management.storage"],
            )
            .initialized(self.endpoint_attributes(&self.configuration.public_srm_endpoint())),
        );
        records.push(self.access_policy(&srm_id).initialized(self.access_policy_attributes()?));

        for endpoint in self.web_endpoints()? {
            records.push(
                self.endpoint(
                    &endpoint.id,
                    ("webdav", "1.1", "http://www.ietf.org/rfc/rfc4918.txt"),
                    &["data.management.storage", "data.management.transfer"],
                )
                .initialized(self.endpoint_attributes(&endpoint.url)),
            );
            records.push(
                self.access_policy(&endpoint.id)
                    .initialized(self.access_policy_attributes()?),
            );
        }

        debug!("{} GLUE 2 static records", records.len());
        Ok(records)
    }

    fn update_records(&self, space: Option<&SpaceInfo>) -> Result<Vec<DirectoryRecord>> {
        let mut records = self.endpoint_patches()?;
        let Some(space) = space else {
            return Ok(records);
        };

        for capacity in CapacityType::present_in(&space.summary) {
            records.push(
                DirectoryRecord::patch(self.service_capacity_dn(capacity))
                    .with(Self::service_capacity_sizes(&space.summary, capacity)),
            );
        }

        let serving_state = self.configuration.serving_state().as_str();
        for vfs in space.vfs.values() {
            records.push(
                DirectoryRecord::patch(self.share_dn(vfs))
                    .with(Attributes::new().with("GLUE2StorageShareServingState", serving_state)),
            );
            for capacity in CapacityType::present_in(&vfs.space) {
                records.push(
                    DirectoryRecord::patch(self.share_capacity_dn(vfs, capacity))
                        .with(Self::share_capacity_sizes(&vfs.space, capacity)),
                );
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{default_configuration, default_values};
    use crate::config::{Configuration, ConfigurationSource};
    use crate::space::record::tests::vfs;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn space_info() -> SpaceInfo {
        SpaceInfo::from_vfs([
            vfs(
                "TESTVO-FS",
                &["testvo"],
                SpaceRecord {
                    total: 4_000_000_000,
                    available: 2_500_000_000,
                    used: 1_500_000_000,
                    free: 2_500_000_000,
                    ..Default::default()
                },
            ),
            vfs("NOAUTH-FS", &["*"], SpaceRecord::with_capacity(2_000_000_000, 0)),
        ])
        .unwrap()
    }

    fn configuration(overrides: &[(&str, &str)], removed: &[&str]) -> Configuration {
        let mut values = default_values();
        for key in removed {
            values.remove(*key);
        }
        for (key, value) in overrides {
            values.insert(key.to_string(), value.to_string());
        }
        Configuration::load(ConfigurationSource::FromMapping(values)).unwrap()
    }

    fn dn_prefixes(records: &[DirectoryRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| r.dn().split(',').next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_static_record_order() {
        let config = default_configuration();
        let records = Glue2::new(&config, created_at()).static_records(&space_info()).unwrap();
        let service = "storm.example.org/storage";
        let expected: Vec<String> = vec![
            format!("GLUE2ServiceID={}", service),
            format!("GLUE2StorageServiceCapacityID={}/capacity/online", service),
            format!("GLUE2StorageAccessProtocolID={}/accessprotocol/file/1.0.0", service),
            format!("GLUE2StorageAccessProtocolID={}/accessprotocol/gsiftp/2.0.0", service),
            format!("GLUE2StorageAccessProtocolID={}/accessprotocol/webdav/1.1", service),
            format!("GLUE2ManagerID={}/manager", service),
            format!("GLUE2ResourceID={}/datastore/disk", service),
            format!("GLUE2ShareID={}/share/testvo", service),
            format!("GLUE2PolicyID={}/share/testvo/mappingpolicy", service),
            format!("GLUE2StorageShareCapacityID={}/share/testvo/capacity/online", service),
            format!("GLUE2ShareID={}/share/noauth", service),
            format!("GLUE2PolicyID={}/share/noauth/mappingpolicy", service),
            format!("GLUE2StorageShareCapacityID={}/share/noauth/capacity/online", service),
            format!("GLUE2EndpointID={}/endpoint/SRM0", service),
            format!("GLUE2PolicyID={}/endpoint/SRM0_Policy", service),
            format!("GLUE2EndpointID={}/endpoint/HTTP0", service),
            format!("GLUE2PolicyID={}/endpoint/HTTP0_Policy", service),
            format!("GLUE2EndpointID={}/endpoint/HTTPS1", service),
            format!("GLUE2PolicyID={}/endpoint/HTTPS1_Policy", service),
        ];
        assert_eq!(dn_prefixes(&records), expected);
        assert!(records.iter().all(|r| r.dn().ends_with(GLUE2_BASE_DN)));
    }

    #[test]
    fn test_zero_capacity_is_not_published() {
        let config = default_configuration();
        let records = Glue2::new(&config, created_at()).static_records(&space_info()).unwrap();
        assert!(!records.iter().any(|r| r.dn().contains("/capacity/nearline")));
        assert!(!records.iter().any(|r| r.dn().contains("/datastore/tape")));

        let service_capacity = &records[1];
        assert_eq!(service_capacity.first("GLUE2StorageServiceCapacityTotalSize"), Some("6"));
        assert_eq!(service_capacity.first("GLUE2StorageServiceCapacityUsedSize"), Some("2"));
        assert_eq!(service_capacity.first("GLUE2EntityCreationTime"), Some("2024-03-01T12:00:00Z"));
    }

    #[test]
    fn test_nearline_capacity_is_published() {
        let config = default_configuration();
        let info = SpaceInfo::from_vfs([vfs(
            "TAPE-FS",
            &["testvo"],
            SpaceRecord::with_capacity(0, 20_000_000_000),
        )])
        .unwrap();
        let records = Glue2::new(&config, created_at()).static_records(&info).unwrap();

        let tape = records
            .iter()
            .find(|r| r.dn().starts_with("GLUE2ResourceID=storm.example.org/storage/datastore/tape"))
            .unwrap();
        assert_eq!(tape.first("GLUE2DataStoreTotalSize"), Some("20"));
        assert_eq!(tape.first("GLUE2DataStoreLatency"), Some("nearline"));
        assert!(!records.iter().any(|r| r.dn().contains("/capacity/online")));
        assert!(!records.iter().any(|r| r.dn().contains("/datastore/disk")));
    }

    #[test]
    fn test_shares() {
        let config = default_configuration();
        let records = Glue2::new(&config, created_at()).static_records(&space_info()).unwrap();

        let testvo = &records[7];
        assert_eq!(testvo.first("GLUE2StorageShareSharingID"), Some("testvo:replica:online"));
        assert_eq!(testvo.first("GLUE2StorageShareTag"), Some("testvo"));
        assert_eq!(testvo.first("GLUE2ShareDescription"), Some("Share for testvo"));
        assert_eq!(testvo.first("GLUE2StorageShareServingState"), Some("production"));
        assert_eq!(testvo.first("GLUE2StorageSharePath"), Some("/testvo"));
        assert_eq!(records[8].first("GLUE2PolicyUserDomainForeignKey"), Some("testvo"));

        let noauth = &records[10];
        assert_eq!(noauth.first("GLUE2StorageShareSharingID"), Some("dedicated"));
        assert!(noauth.get("GLUE2StorageShareTag").is_none());
        assert!(noauth.get("GLUE2ShareDescription").is_none());
        assert!(records[11].get("GLUE2PolicyUserDomainForeignKey").is_none());
        assert_eq!(records[11].first("GLUE2PolicyRule"), Some("vo:*"));
    }

    #[test]
    fn test_endpoints() {
        let config = default_configuration();
        let records = Glue2::new(&config, created_at()).static_records(&space_info()).unwrap();

        let srm = &records[13];
        assert_eq!(srm.first("GLUE2EndpointURL"), Some("httpg://storm-fe.example.org:8444/srm/managerv2"));
        assert_eq!(srm.first("GLUE2EndpointQualityLevel"), Some("pre-production"));
        assert_eq!(srm.first("GLUE2EndpointInterfaceName"), Some("SRM"));

        let http = &records[15];
        assert_eq!(http.first("GLUE2EndpointURL"), Some("http://webdav.example.org:8085/"));
        assert_eq!(http.first("GLUE2EndpointInterfaceName"), Some("webdav"));
        assert_eq!(
            http.first("GLUE2EndpointIssuerCA"),
            Some("/C=IT/O=INFN/CN=INFN Certification Authority")
        );

        let policy = &records[16];
        assert_eq!(policy.get("GLUE2PolicyRule").unwrap(), &["vo:testvo".to_string()]);
        assert_eq!(policy.first("GLUE2AccessPolicyEndpointForeignKey"), Some("storm.example.org/storage/endpoint/HTTP0"));
    }

    #[test]
    fn test_gridhttps_endpoints() {
        let config = configuration(
            &[
                ("STORM_GRIDHTTPS_ENABLED", "true"),
                ("STORM_GRIDHTTPS_PUBLIC_HOST", "gridhttps.example.org"),
                ("STORM_GRIDHTTPS_HTTP_PORT", "8085"),
                ("STORM_GRIDHTTPS_HTTPS_PORT", "8443"),
            ],
            &["STORM_WEBDAV_POOL_LIST", "ISSUER_CA"],
        );
        let records = Glue2::new(&config, created_at()).static_records(&space_info()).unwrap();
        let endpoints: Vec<_> = records
            .iter()
            .filter(|r| r.dn().starts_with("GLUE2EndpointID="))
            .collect();
        assert_eq!(endpoints.len(), 3);
        assert_eq!(endpoints[1].first("GLUE2EndpointURL"), Some("http://gridhttps.example.org:8085/"));
        assert_eq!(endpoints[2].first("GLUE2EndpointURL"), Some("https://gridhttps.example.org:8443/"));
        assert!(endpoints[2].dn().contains("/endpoint/HTTPS0"));
        assert!(endpoints[2].get("GLUE2EndpointIssuerCA").is_none());
    }

    #[test]
    fn test_invalid_webdav_scheme() {
        let config = configuration(&[("STORM_WEBDAV_POOL_LIST", "ftp://webdav.example.org/")], &[]);
        let err = Glue2::new(&config, created_at()).static_records(&space_info()).unwrap_err();
        assert_matches!(err, Error::Configuration(_));
    }

    #[test]
    fn test_update_records() {
        let config = default_configuration();
        let glue = Glue2::new(&config, created_at());
        let info = space_info();
        let records = glue.update_records(Some(&info)).unwrap();
        let service = "storm.example.org/storage";
        assert_eq!(
            dn_prefixes(&records),
            vec![
                format!("GLUE2EndpointID={}/endpoint/SRM0", service),
                format!("GLUE2EndpointID={}/endpoint/HTTP0", service),
                format!("GLUE2EndpointID={}/endpoint/HTTPS1", service),
                format!("GLUE2StorageServiceCapacityID={}/capacity/online", service),
                format!("GLUE2ShareID={}/share/testvo", service),
                format!("GLUE2StorageShareCapacityID={}/share/testvo/capacity/online", service),
                format!("GLUE2ShareID={}/share/noauth", service),
                format!("GLUE2StorageShareCapacityID={}/share/noauth/capacity/online", service),
            ]
        );
        assert_eq!(records[0].attributes().len(), 1);
        assert_eq!(records[0].first("GLUE2EndpointServingState"), Some("production"));
        assert!(records[3].get("GLUE2StorageServiceCapacityType").is_none());

        let statics = glue.static_records(&info).unwrap();
        for patch in &records {
            assert!(statics.iter().any(|r| r.dn() == patch.dn()), "{}", patch.dn());
        }
    }

    #[test]
    fn test_closed_service_updates_endpoints_only() {
        let config = configuration(&[("STORM_SERVING_STATE", "closed")], &[]);
        let records = Glue2::new(&config, created_at()).update_records(None).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.first("GLUE2EndpointServingState") == Some("closed")));
    }
}
