//! GLUE 1.3 Mapper
//!
//! Publishes the storage element, one storage area per VFS, VO info for
//! VO-bound areas, the SRM control protocol and the access protocols.

use super::units::{as_gigabytes, as_kilobytes};
use super::GlueSchema;
use crate::config::Configuration;
use crate::error::Result;
use crate::ldif::{Attributes, DirectoryRecord};
use crate::space::{SpaceInfo, VirtualFileSystemRecord};
use tracing::debug;

/// Base DN of every GLUE 1.3 record
pub const GLUE13_BASE_DN: &str = "mds-vo-name=resource,o=grid";

/// LDAP port the resource BDII listens on
const RESOURCE_BDII_PORT: u16 = 2170;

const CONTROL_PROTOCOL_ID: &str = "srm_v2.2";

/// Version and max streams published for an access protocol
fn access_protocol_info(protocol: &str) -> (&'static str, &'static str) {
    match protocol {
        "gsiftp" => ("1.0.0", "10"),
        "http" | "https" => ("1.1.0", "1"),
        "webdav" => ("1.1", "1"),
        _ => ("1.0.0", "1"),
    }
}

// =============================================================================
// Object Classes
// =============================================================================

fn se_dn(se_id: &str) -> String {
    format!("GlueSEUniqueID={},{}", se_id, GLUE13_BASE_DN)
}

fn sa_dn(sa_id: &str, se_id: &str) -> String {
    format!("GlueSALocalID={},{}", sa_id, se_dn(se_id))
}

fn glue_se(se_id: &str) -> DirectoryRecord {
    DirectoryRecord::new(
        se_dn(se_id),
        Attributes::new()
            .with("GlueSEUniqueID", se_id)
            .with(
                "objectClass",
                ["GlueSETop", "GlueSE", "GlueInformationService", "GlueKey", "GlueSchemaVersion"],
            )
            .with("GlueSESizeTotal", 0u64)
            .with("GlueSESizeFree", 0u64)
            .with("GlueSETotalOnlineSize", 0u64)
            .with("GlueSEUsedOnlineSize", 0u64)
            .with("GlueSETotalNearlineSize", 0u64)
            .with("GlueSEUsedNearlineSize", 0u64)
            .with("GlueSEArchitecture", "multidisk")
            .with("GlueSEStatus", "Production")
            .with("GlueSEImplementationName", "StoRM")
            .with("GlueSchemaVersionMajor", 1u32)
            .with("GlueSchemaVersionMinor", 3u32),
    )
}

fn glue_sa(sa_id: &str, se_id: &str) -> DirectoryRecord {
    DirectoryRecord::new(
        sa_dn(sa_id, se_id),
        Attributes::new()
            .with("GlueSALocalID", sa_id)
            .with(
                "objectClass",
                [
                    "GlueSATop",
                    "GlueSA",
                    "GlueSAPolicy",
                    "GlueSAState",
                    "GlueSAAccessControlBase",
                    "GlueKey",
                    "GlueSchemaVersion",
                ],
            )
            .with("GlueSATotalOnlineSize", 0u64)
            .with("GlueSAUsedOnlineSize", 0u64)
            .with("GlueSAFreeOnlineSize", 0u64)
            .with("GlueSAReservedOnlineSize", 0u64)
            .with("GlueSATotalNearlineSize", 0u64)
            .with("GlueSAUsedNearlineSize", 0u64)
            .with("GlueSAFreeNearlineSize", 0u64)
            .with("GlueSAReservedNearlineSize", 0u64)
            .with("GlueSAAccessLatency", "online")
            .with("GlueSAExpirationMode", "neverExpire")
            .with("GlueSAPolicyFileLifeTime", "permanent")
            .with("GlueSAType", "permanent")
            .with("GlueSchemaVersionMajor", 1u32)
            .with("GlueSchemaVersionMinor", 3u32)
            .with("GlueChunkKey", format!("GlueSEUniqueID={}", se_id)),
    )
}

fn glue_vo_info(vo_info_id: &str, sa_id: &str, se_id: &str) -> DirectoryRecord {
    DirectoryRecord::new(
        format!("GlueVOInfoLocalID={},{}", vo_info_id, sa_dn(sa_id, se_id)),
        Attributes::new()
            .with("GlueVOInfoLocalID", vo_info_id)
            .with("objectClass", ["GlueSATop", "GlueVOInfo", "GlueKey", "GlueSchemaVersion"])
            .with("GlueSchemaVersionMajor", 1u32)
            .with("GlueSchemaVersionMinor", 3u32)
            .with(
                "GlueChunkKey",
                vec![
                    format!("GlueSALocalID={}", sa_id),
                    format!("GlueSEUniqueID={}", se_id),
                ],
            ),
    )
}

fn glue_control_protocol(protocol_id: &str, se_id: &str) -> DirectoryRecord {
    DirectoryRecord::new(
        format!("GlueSEControlProtocolLocalID={},{}", protocol_id, se_dn(se_id)),
        Attributes::new()
            .with("GlueSEControlProtocolLocalID", protocol_id)
            .with(
                "objectClass",
                ["GlueSETop", "GlueSEControlProtocol", "GlueKey", "GlueSchemaVersion"],
            )
            .with("GlueSEControlProtocolType", "SRM")
            .with("GlueSEControlProtocolVersion", "2.2.0")
            .with("GlueSchemaVersionMajor", 1u32)
            .with("GlueSchemaVersionMinor", 3u32)
            .with("GlueChunkKey", format!("GlueSEUniqueID={}", se_id)),
    )
}

fn glue_access_protocol(protocol: &str, se_id: &str) -> DirectoryRecord {
    DirectoryRecord::new(
        format!("GlueSEAccessProtocolLocalID={},{}", protocol, se_dn(se_id)),
        Attributes::new()
            .with("GlueSEAccessProtocolLocalID", protocol)
            .with("GlueSEAccessProtocolType", protocol)
            .with(
                "objectClass",
                ["GlueSETop", "GlueSEAccessProtocol", "GlueKey", "GlueSchemaVersion"],
            )
            .with("GlueSEAccessProtocolSupportedSecurity", "GSI")
            .with("GlueSchemaVersionMajor", 1u32)
            .with("GlueSchemaVersionMinor", 3u32)
            .with("GlueChunkKey", format!("GlueSEUniqueID={}", se_id)),
    )
}

// =============================================================================
// Mapper
// =============================================================================

/// GLUE 1.3 dialect
pub struct Glue13<'a> {
    configuration: &'a Configuration,
}

impl<'a> Glue13<'a> {
    pub fn new(configuration: &'a Configuration) -> Self {
        Self { configuration }
    }

    fn se_id(&self) -> &str {
        self.configuration.frontend_public_host()
    }

    /// `<area>:<retention>:<latency>`, lower case
    pub fn sa_local_id(vfs: &VirtualFileSystemRecord) -> String {
        format!(
            "{}:{}:{}",
            vfs.short_name().to_lowercase(),
            vfs.retention_policy,
            vfs.access_latency
        )
    }

    /// `<vo>:<token>` for areas with a custom token, the VO otherwise
    fn vo_info_id(&self, vfs: &VirtualFileSystemRecord, vo: &str) -> String {
        if self.configuration.vfs_has_custom_token(&vfs.name) {
            format!("{}:{}", vo, vfs.token)
        } else {
            vo.to_string()
        }
    }

    fn se_space_attributes(space: &SpaceInfo) -> Attributes {
        let summary = &space.summary;
        Attributes::new()
            .with(
                "GlueSESizeTotal",
                as_gigabytes(summary.total) + as_gigabytes(summary.nearline),
            )
            .with("GlueSESizeFree", as_gigabytes(summary.free))
            .with("GlueSETotalOnlineSize", as_gigabytes(summary.total))
            .with("GlueSEUsedOnlineSize", as_gigabytes(summary.used))
            .with("GlueSETotalNearlineSize", as_gigabytes(summary.nearline))
    }

    fn sa_space_attributes(vfs: &VirtualFileSystemRecord) -> Attributes {
        let space = &vfs.space;
        Attributes::new()
            .with("GlueSATotalOnlineSize", as_gigabytes(space.total))
            .with("GlueSAUsedOnlineSize", as_gigabytes(space.used))
            .with("GlueSAFreeOnlineSize", as_gigabytes(space.free))
            // reserved equals total for GLUE 1.3
            .with("GlueSAReservedOnlineSize", as_gigabytes(space.total))
            .with("GlueSATotalNearlineSize", as_gigabytes(space.nearline))
            .with("GlueSAFreeNearlineSize", as_gigabytes(space.nearline))
    }

    fn sa_record(&self, vfs: &VirtualFileSystemRecord) -> DirectoryRecord {
        let space = &vfs.space;
        let acbr: Vec<String> = vfs.vos.iter().map(|vo| format!("VO:{}", vo)).collect();
        let name = if vfs.is_anonymous() {
            "Custom space for non-VO users".to_string()
        } else {
            format!("Reserved space for {} VO", vfs.vos.join(","))
        };

        glue_sa(&Self::sa_local_id(vfs), self.se_id()).initialized(
            Self::sa_space_attributes(vfs)
                .with("GlueSARetentionPolicy", vfs.retention_policy.as_str())
                .with("GlueSAAccessLatency", vfs.access_latency.as_str())
                .with("GlueSAStateAvailableSpace", as_kilobytes(space.available))
                .with("GlueSAStateUsedSpace", as_kilobytes(space.used))
                .with("GlueSAAccessControlBaseRule", acbr)
                .with(
                    "GlueSACapability",
                    vec![
                        format!("InstalledOnlineCapacity={}", as_gigabytes(space.total)),
                        format!("InstalledNearlineCapacity={}", as_gigabytes(space.nearline)),
                    ],
                )
                .with("GlueSAName", name),
        )
    }

    fn vo_info_records(&self, vfs: &VirtualFileSystemRecord) -> Vec<DirectoryRecord> {
        if vfs.is_anonymous() {
            return Vec::new();
        }
        let sa_id = Self::sa_local_id(vfs);
        let custom_token = self.configuration.vfs_has_custom_token(&vfs.name);
        vfs.accounted_vos()
            .map(|vo| {
                let mut attributes = Attributes::new()
                    .with("GlueVOInfoPath", vfs.primary_path())
                    .with("GlueVOInfoAccessControlBaseRule", format!("VO:{}", vo));
                if custom_token {
                    attributes.set("GlueVOInfoTag", &vfs.token);
                }
                glue_vo_info(&self.vo_info_id(vfs, vo), &sa_id, self.se_id()).initialized(attributes)
            })
            .collect()
    }
}

impl GlueSchema for Glue13<'_> {
    fn name(&self) -> &'static str {
        "glue13"
    }

    fn static_ldif_file_name(&self) -> &'static str {
        "storm-glue13-static.ldif"
    }

    fn static_records(&self, space: &SpaceInfo) -> Result<Vec<DirectoryRecord>> {
        let se_id = self.se_id();
        let mut records = Vec::new();

        records.push(glue_se(se_id).initialized(
            Self::se_space_attributes(space)
                .with("GlueSEName", format!("{}:srm_v2", self.configuration.site_name()))
                .with(
                    "GlueSEImplementationVersion",
                    self.configuration.implementation_version(),
                )
                .with(
                    "GlueInformationServiceURL",
                    format!(
                        "ldap://{}:{}/{}",
                        self.configuration.backend_hostname(),
                        RESOURCE_BDII_PORT,
                        GLUE13_BASE_DN
                    ),
                )
                .with(
                    "GlueForeignKey",
                    format!("GlueSiteUniqueID={}", self.configuration.site_name()),
                ),
        ));

        for vfs in space.vfs.values() {
            records.push(self.sa_record(vfs));
            records.extend(self.vo_info_records(vfs));
        }

        records.push(
            glue_control_protocol(CONTROL_PROTOCOL_ID, se_id).initialized(Attributes::new().with(
                "GlueSEControlProtocolEndpoint",
                self.configuration.public_srm_endpoint(),
            )),
        );

        for protocol in self.configuration.enabled_access_protocols() {
            let (version, max_streams) = access_protocol_info(&protocol);
            records.push(
                glue_access_protocol(&protocol, se_id).initialized(
                    Attributes::new()
                        .with("GlueSEAccessProtocolVersion", version)
                        .with("GlueSEAccessProtocolMaxStreams", max_streams),
                ),
            );
        }

        debug!("{} GLUE 1.3 static records", records.len());
        Ok(records)
    }

    fn update_records(&self, space: Option<&SpaceInfo>) -> Result<Vec<DirectoryRecord>> {
        let Some(space) = space else {
            return Ok(Vec::new());
        };
        let se_id = self.se_id();
        let mut records = Vec::new();

        records.push(DirectoryRecord::patch(se_dn(se_id)).with(
            Self::se_space_attributes(space).with("GlueSEUsedNearlineSize", "0"),
        ));

        for vfs in space.vfs.values() {
            records.push(
                DirectoryRecord::patch(sa_dn(&Self::sa_local_id(vfs), se_id)).with(
                    Self::sa_space_attributes(vfs)
                        .with("GlueSAUsedNearlineSize", "0")
                        .with("GlueSAReservedNearlineSize", "0")
                        .with("GlueSAStateAvailableSpace", as_kilobytes(vfs.space.available))
                        .with("GlueSAStateUsedSpace", as_kilobytes(vfs.space.used)),
                ),
            );
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::default_configuration;
    use crate::space::record::tests::vfs;
    use crate::space::{AccessLatency, RetentionPolicy, SpaceRecord};

    fn space_info() -> SpaceInfo {
        let mut tape = vfs("TAPE-FS", &["testvo"], SpaceRecord::with_capacity(1_000_000_000, 20_000_000_000));
        tape.retention_policy = RetentionPolicy::Custodial;
        tape.access_latency = AccessLatency::Nearline;
        tape.storage_class = "T1D0".into();

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
            tape,
            vfs("NOAUTH-FS", &["*"], SpaceRecord::with_capacity(2_000_000_000, 0)),
        ])
        .unwrap()
    }

    fn find<'r>(records: &'r [DirectoryRecord], prefix: &str) -> &'r DirectoryRecord {
        records
            .iter()
            .find(|r| r.dn().starts_with(prefix))
            .unwrap_or_else(|| panic!("no record {}", prefix))
    }

    #[test]
    fn test_static_record_order() {
        let config = default_configuration();
        let records = Glue13::new(&config).static_records(&space_info()).unwrap();
        let kinds: Vec<_> = records
            .iter()
            .map(|r| r.dn().split('=').next().unwrap().to_string())
            .collect();
        assert_eq!(
            kinds,
            vec![
                "GlueSEUniqueID",
                "GlueSALocalID",
                "GlueVOInfoLocalID",
                "GlueSALocalID",
                "GlueVOInfoLocalID",
                "GlueSALocalID",
                "GlueSEControlProtocolLocalID",
                "GlueSEAccessProtocolLocalID",
                "GlueSEAccessProtocolLocalID",
                "GlueSEAccessProtocolLocalID",
            ]
        );
    }

    #[test]
    fn test_storage_element_sizes() {
        let config = default_configuration();
        let records = Glue13::new(&config).static_records(&space_info()).unwrap();
        let se = &records[0];
        assert_eq!(
            se.dn(),
            "GlueSEUniqueID=storm-fe.example.org,mds-vo-name=resource,o=grid"
        );
        assert_eq!(se.first("GlueSEName"), Some("test-site:srm_v2"));
        assert_eq!(se.first("GlueSESizeTotal"), Some("27"));
        assert_eq!(se.first("GlueSETotalOnlineSize"), Some("7"));
        assert_eq!(se.first("GlueSEUsedOnlineSize"), Some("2"));
        assert_eq!(se.first("GlueSETotalNearlineSize"), Some("20"));
        assert_eq!(se.first("GlueSEImplementationVersion"), Some("1.11.15"));
        assert_eq!(
            se.first("GlueInformationServiceURL"),
            Some("ldap://storm.example.org:2170/mds-vo-name=resource,o=grid")
        );
        assert_eq!(se.first("GlueSEArchitecture"), Some("multidisk"));
    }

    #[test]
    fn test_storage_areas() {
        let config = default_configuration();
        let records = Glue13::new(&config).static_records(&space_info()).unwrap();

        let testvo = find(&records, "GlueSALocalID=testvo:replica:online,");
        assert_eq!(testvo.first("GlueSAName"), Some("Reserved space for testvo VO"));
        assert_eq!(testvo.first("GlueSAReservedOnlineSize"), Some("4"));
        assert_eq!(testvo.first("GlueSAStateUsedSpace"), Some("1500000"));
        assert_eq!(testvo.first("GlueSAAccessControlBaseRule"), Some("VO:testvo"));

        let tape = find(&records, "GlueSALocalID=tape:custodial:nearline,");
        assert_eq!(tape.first("GlueSAAccessLatency"), Some("nearline"));
        assert_eq!(
            tape.get("GlueSACapability").unwrap(),
            &["InstalledOnlineCapacity=1".to_string(), "InstalledNearlineCapacity=20".to_string()]
        );

        let noauth = find(&records, "GlueSALocalID=noauth:replica:online,");
        assert_eq!(noauth.first("GlueSAName"), Some("Custom space for non-VO users"));
    }

    #[test]
    fn test_vo_info_uses_custom_token() {
        let config = default_configuration();
        let records = Glue13::new(&config).static_records(&space_info()).unwrap();

        let custom = find(&records, "GlueVOInfoLocalID=testvo:TESTVO_TOKEN,GlueSALocalID=testvo:");
        assert_eq!(custom.first("GlueVOInfoTag"), Some("TESTVO_TOKEN"));
        assert_eq!(custom.first("GlueVOInfoPath"), Some("/testvo"));

        let plain = find(&records, "GlueVOInfoLocalID=testvo,GlueSALocalID=tape:");
        assert!(plain.get("GlueVOInfoTag").is_none());

        assert!(!records.iter().any(|r| r.dn().contains("GlueSALocalID=noauth") && r.dn().starts_with("GlueVOInfoLocalID")));
    }

    #[test]
    fn test_protocols() {
        let config = default_configuration();
        let records = Glue13::new(&config).static_records(&space_info()).unwrap();

        let srm = find(&records, "GlueSEControlProtocolLocalID=srm_v2.2,");
        assert_eq!(
            srm.first("GlueSEControlProtocolEndpoint"),
            Some("httpg://storm-fe.example.org:8444/srm/managerv2")
        );
        let gsiftp = find(&records, "GlueSEAccessProtocolLocalID=gsiftp,");
        assert_eq!(gsiftp.first("GlueSEAccessProtocolMaxStreams"), Some("10"));
        let webdav = find(&records, "GlueSEAccessProtocolLocalID=webdav,");
        assert_eq!(webdav.first("GlueSEAccessProtocolVersion"), Some("1.1"));
    }

    #[test]
    fn test_update_records() {
        let config = default_configuration();
        let glue = Glue13::new(&config);
        let info = space_info();
        let records = glue.update_records(Some(&info)).unwrap();
        assert_eq!(records.len(), 4);

        let se = &records[0];
        assert_eq!(se.first("GlueSEUsedNearlineSize"), Some("0"));
        assert!(se.get("objectClass").is_none());

        let statics = glue.static_records(&info).unwrap();
        for patch in &records[1..] {
            assert!(statics.iter().any(|r| r.dn() == patch.dn()));
            assert_eq!(patch.first("GlueSAReservedNearlineSize"), Some("0"));
        }

        assert!(glue.update_records(None).unwrap().is_empty());
    }
}
