//! Storage Area Facts
//!
//! Everything the provider derives from the `STORM_<SA>_*` keys of one
//! storage area.

use crate::space::{AccessLatency, RetentionPolicy, SpaceRecord, VirtualFileSystemRecord};

/// Raw settings read from the configuration for one storage area
#[derive(Debug, Clone)]
pub(crate) struct StorageAreaSettings {
    pub name: String,
    pub short: String,
    pub token: String,
    pub has_custom_token: bool,
    pub vos: Vec<String>,
    pub root: String,
    pub storage_class: String,
    pub access_points: Vec<String>,
    pub dn_fragments: Vec<String>,
    pub online_size: u64,
    pub nearline_size: u64,
}

/// Derived facts of a configured storage area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageArea {
    /// Name as listed in `STORM_STORAGEAREA_LIST`
    pub name: String,
    /// Upper-case key fragment, e.g. `TESTVO`
    pub short: String,
    pub token: String,
    /// `STORM_<SA>_TOKEN` is set explicitly
    pub has_custom_token: bool,
    pub vos: Vec<String>,
    pub root: String,
    pub storage_class: String,
    pub access_points: Vec<String>,
    pub approachable_rules: Vec<String>,
    pub retention_policy: RetentionPolicy,
    pub access_latency: AccessLatency,
    /// Online size in bytes
    pub online_size: u64,
    /// Nearline size in bytes
    pub nearline_size: u64,
}

impl StorageArea {
    pub(crate) fn derive(settings: StorageAreaSettings) -> Self {
        let approachable_rules = approachable_rules(&settings.vos, &settings.dn_fragments);
        Self {
            retention_policy: RetentionPolicy::from_storage_class(&settings.storage_class),
            access_latency: AccessLatency::from_storage_class(&settings.storage_class),
            name: settings.name,
            short: settings.short,
            token: settings.token,
            has_custom_token: settings.has_custom_token,
            vos: settings.vos,
            root: settings.root,
            storage_class: settings.storage_class,
            access_points: settings.access_points,
            approachable_rules,
            online_size: settings.online_size,
            nearline_size: settings.nearline_size,
        }
    }

    /// Name the backend would publish for this area
    pub fn vfs_name(&self) -> String {
        format!("{}-FS", self.short)
    }

    /// Build the record published when the backend cannot be asked
    pub fn to_vfs_record(&self, protocols: &[String]) -> VirtualFileSystemRecord {
        VirtualFileSystemRecord {
            name: self.vfs_name(),
            token: self.token.clone(),
            vos: self.vos.clone(),
            root: self.root.clone(),
            storage_class: self.storage_class.clone(),
            stfn_root: self.access_points.clone(),
            retention_policy: self.retention_policy,
            access_latency: self.access_latency,
            protocols: protocols.to_vec(),
            approachable_rules: self.approachable_rules.clone(),
            space: SpaceRecord::with_capacity(self.online_size, self.nearline_size),
        }
    }
}

/// One `vo:<VO>` rule per VO, plus the DN fragments as a single rule.
/// Falls back to `ALL` when neither is configured.
pub fn approachable_rules(vos: &[String], dn_fragments: &[String]) -> Vec<String> {
    let mut rules: Vec<String> = vos.iter().map(|vo| format!("vo:{}", vo)).collect();
    if !dn_fragments.is_empty() {
        rules.push(dn_fragments.concat());
    }
    if rules.is_empty() {
        rules.push("ALL".to_string());
    }
    rules
}
