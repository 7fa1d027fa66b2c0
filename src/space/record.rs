//! Space Records
//!
//! Byte counters for storage areas and the aggregate snapshot built from
//! them. Every aggregation run constructs these from scratch.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

/// VO name that stands for "any VO"
pub const ANONYMOUS_VO: &str = "*";

// =============================================================================
// Space Record
// =============================================================================

/// Byte counters of a storage area (or of a sum of storage areas)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRecord {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub unavailable: u64,
    pub reserved: u64,
    pub busy: u64,
    pub nearline: u64,
}

impl SpaceRecord {
    /// Record with nothing known beyond the installed capacity.
    ///
    /// The whole online size counts as available and free.
    pub fn with_capacity(online: u64, nearline: u64) -> Self {
        Self {
            total: online,
            available: online,
            free: online,
            nearline,
            ..Default::default()
        }
    }

    pub fn has_online_capacity(&self) -> bool {
        self.total > 0
    }

    pub fn has_nearline_capacity(&self) -> bool {
        self.nearline > 0
    }

    /// Elementwise sum of two records
    pub fn sum(&self, other: &SpaceRecord) -> SpaceRecord {
        SpaceRecord {
            total: self.total + other.total,
            available: self.available + other.available,
            used: self.used + other.used,
            free: self.free + other.free,
            unavailable: self.unavailable + other.unavailable,
            reserved: self.reserved + other.reserved,
            busy: self.busy + other.busy,
            nearline: self.nearline + other.nearline,
        }
    }
}

impl Add for SpaceRecord {
    type Output = SpaceRecord;

    fn add(self, rhs: SpaceRecord) -> SpaceRecord {
        self.sum(&rhs)
    }
}

impl AddAssign for SpaceRecord {
    fn add_assign(&mut self, rhs: SpaceRecord) {
        *self = self.sum(&rhs);
    }
}

impl Sum for SpaceRecord {
    fn sum<I: Iterator<Item = SpaceRecord>>(iter: I) -> Self {
        iter.fold(SpaceRecord::default(), |acc, r| acc + r)
    }
}

impl<'a> Sum<&'a SpaceRecord> for SpaceRecord {
    fn sum<I: Iterator<Item = &'a SpaceRecord>>(iter: I) -> Self {
        iter.fold(SpaceRecord::default(), |acc, r| acc.sum(r))
    }
}

impl fmt::Display for SpaceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[total: {}, available: {}, used: {}, free: {}, unavailable: {}, reserved: {}, busy: {}, near_line: {}]",
            self.total,
            self.available,
            self.used,
            self.free,
            self.unavailable,
            self.reserved,
            self.busy,
            self.nearline
        )
    }
}

// =============================================================================
// Storage Policies
// =============================================================================

/// How long data is guaranteed to be kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    Custodial,
    Replica,
    Output,
}

impl RetentionPolicy {
    /// Derive the policy from a storage class code such as `T1D0`
    pub fn from_storage_class(storage_class: &str) -> Self {
        if storage_class.contains("T1") {
            RetentionPolicy::Custodial
        } else {
            RetentionPolicy::Replica
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetentionPolicy::Custodial => "custodial",
            RetentionPolicy::Replica => "replica",
            RetentionPolicy::Output => "output",
        }
    }
}

impl FromStr for RetentionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "custodial" => Ok(RetentionPolicy::Custodial),
            "replica" => Ok(RetentionPolicy::Replica),
            "output" => Ok(RetentionPolicy::Output),
            _ => Err(Error::InvalidConfigurationValue {
                key: "retentionPolicy".into(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How quickly data becomes readable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLatency {
    Online,
    Nearline,
    Offline,
}

impl AccessLatency {
    /// Derive the latency from a storage class code such as `T1D0`
    pub fn from_storage_class(storage_class: &str) -> Self {
        if storage_class.contains("D0") {
            AccessLatency::Nearline
        } else {
            AccessLatency::Online
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLatency::Online => "online",
            AccessLatency::Nearline => "nearline",
            AccessLatency::Offline => "offline",
        }
    }
}

impl FromStr for AccessLatency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "online" => Ok(AccessLatency::Online),
            "nearline" => Ok(AccessLatency::Nearline),
            "offline" => Ok(AccessLatency::Offline),
            _ => Err(Error::InvalidConfigurationValue {
                key: "accessLatency".into(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AccessLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Virtual File System Record
// =============================================================================

/// A storage area as published: metadata plus its own space counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VirtualFileSystemRecord {
    /// VFS name, e.g. `TESTVO-FS`
    pub name: String,
    /// Space token
    pub token: String,
    /// Bound VOs; `*` means anonymous
    pub vos: Vec<String>,
    /// Export root on disk
    pub root: String,
    /// Storage class code, e.g. `T0D1`
    pub storage_class: String,
    /// Access points (stfn roots)
    pub stfn_root: Vec<String>,
    pub retention_policy: RetentionPolicy,
    pub access_latency: AccessLatency,
    /// Enabled access protocols
    pub protocols: Vec<String>,
    /// Approachable rules, e.g. `vo:testvo`
    pub approachable_rules: Vec<String>,
    pub space: SpaceRecord,
}

impl VirtualFileSystemRecord {
    /// Whether the area is open to any VO
    pub fn is_anonymous(&self) -> bool {
        self.vos.is_empty() || self.vos.iter().any(|vo| vo.contains(ANONYMOUS_VO))
    }

    /// VOs that take part in per-VO accounting
    pub fn accounted_vos(&self) -> impl Iterator<Item = &str> {
        self.vos
            .iter()
            .map(String::as_str)
            .filter(|vo| !vo.contains(ANONYMOUS_VO))
    }

    /// VFS name without the `-FS` suffix
    pub fn short_name(&self) -> &str {
        short_vfs_name(&self.name)
    }

    /// First access point, falling back to `/<short name>`
    pub fn primary_path(&self) -> String {
        self.stfn_root
            .first()
            .cloned()
            .unwrap_or_else(|| format!("/{}", self.short_name().to_lowercase()))
    }
}

/// Strip the `-FS` suffix the backend appends to storage area names
pub fn short_vfs_name(name: &str) -> &str {
    name.strip_suffix("-FS").unwrap_or(name)
}

// =============================================================================
// Space Info
// =============================================================================

/// Aggregate snapshot: summary, per-VO totals and the storage areas
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpaceInfo {
    pub summary: SpaceRecord,
    pub vos: IndexMap<String, SpaceRecord>,
    pub vfs: IndexMap<String, VirtualFileSystemRecord>,
}

impl SpaceInfo {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from storage areas, in the given order
    pub fn from_vfs(records: impl IntoIterator<Item = VirtualFileSystemRecord>) -> Result<Self> {
        let mut info = Self::new();
        for record in records {
            info.insert(record)?;
        }
        Ok(info)
    }

    /// Add a storage area and account its space in summary and VO totals
    pub fn insert(&mut self, record: VirtualFileSystemRecord) -> Result<()> {
        if self.vfs.contains_key(&record.name) {
            return Err(Error::DuplicateStorageArea { name: record.name });
        }

        let space = record.space;
        for vo in record.accounted_vos() {
            let entry = self.vos.entry(vo.to_string()).or_default();
            *entry += space;
        }
        self.summary += space;
        self.vfs.insert(record.name.clone(), record);
        Ok(())
    }
}

impl fmt::Display for SpaceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "summary: {}, vos: [", self.summary)?;
        for (i, (vo, space)) in self.vos.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", vo, space)?;
        }
        write!(f, "], vfs: {:?}", self.vfs.keys().collect::<Vec<_>>())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn vfs(name: &str, vos: &[&str], space: SpaceRecord) -> VirtualFileSystemRecord {
        VirtualFileSystemRecord {
            name: name.to_string(),
            token: format!("{}_TOKEN", short_vfs_name(name)),
            vos: vos.iter().map(|v| v.to_string()).collect(),
            root: format!("/storage/{}", short_vfs_name(name).to_lowercase()),
            storage_class: "T0D1".to_string(),
            stfn_root: vec![format!("/{}", short_vfs_name(name).to_lowercase())],
            retention_policy: RetentionPolicy::Replica,
            access_latency: AccessLatency::Online,
            protocols: vec!["file".to_string(), "gsiftp".to_string()],
            approachable_rules: vos.iter().map(|v| format!("vo:{}", v)).collect(),
            space,
        }
    }

    fn space(total: u64, used: u64, nearline: u64) -> SpaceRecord {
        SpaceRecord {
            total,
            available: total - used,
            used,
            free: total - used,
            unavailable: 0,
            reserved: total / 10,
            busy: used / 2,
            nearline,
        }
    }

    #[test]
    fn test_with_capacity_defaults() {
        let record = SpaceRecord::with_capacity(4_000_000_000, 1_000_000_000);
        assert_eq!(record.total, 4_000_000_000);
        assert_eq!(record.available, 4_000_000_000);
        assert_eq!(record.free, 4_000_000_000);
        assert_eq!(record.used, 0);
        assert_eq!(record.nearline, 1_000_000_000);
        assert!(record.has_online_capacity());
        assert!(record.has_nearline_capacity());
        assert!(!SpaceRecord::default().has_online_capacity());
    }

    #[test]
    fn test_sum_is_commutative_and_associative() {
        let a = space(100, 10, 5);
        let b = space(200, 150, 0);
        let c = space(7, 3, 1000);

        assert_eq!(a.sum(&b), b.sum(&a));
        assert_eq!(a.sum(&b).sum(&c), a.sum(&b.sum(&c)));
        assert_eq!([a, b, c].iter().sum::<SpaceRecord>(), a + b + c);
    }

    #[test]
    fn test_sum_does_not_touch_operands() {
        let a = space(100, 10, 5);
        let b = space(200, 150, 0);
        let total = a.sum(&b);
        assert_eq!(total.total, 300);
        assert_eq!(a, space(100, 10, 5));
        assert_eq!(b, space(200, 150, 0));
    }

    #[test]
    fn test_summary_matches_vfs_in_any_order() {
        let records = vec![
            vfs("TESTVO-FS", &["testvo"], space(1_000, 100, 0)),
            vfs("TAPE-FS", &["testvo"], space(2_000, 500, 40_000)),
            vfs("NOAUTH-FS", &["*"], space(300, 30, 0)),
            vfs("DTEAM-FS", &["dteam"], space(50, 5, 7)),
        ];

        let forward = SpaceInfo::from_vfs(records.clone()).unwrap();
        let backward = SpaceInfo::from_vfs(records.iter().rev().cloned()).unwrap();

        let expected_total: u64 = records.iter().map(|r| r.space.total).sum();
        let expected_nearline: u64 = records.iter().map(|r| r.space.nearline).sum();
        assert_eq!(forward.summary.total, expected_total);
        assert_eq!(forward.summary.nearline, expected_nearline);
        assert_eq!(forward.summary, backward.summary);
    }

    #[test]
    fn test_vo_totals_skip_anonymous_areas() {
        let info = SpaceInfo::from_vfs(vec![
            vfs("TESTVO-FS", &["testvo"], space(1_000, 100, 0)),
            vfs("TAPE-FS", &["testvo"], space(2_000, 500, 40_000)),
            vfs("NOAUTH-FS", &["*"], space(300, 30, 0)),
            vfs("SHARED-FS", &["testvo", "dteam"], space(10, 1, 0)),
        ])
        .unwrap();

        assert_eq!(info.vos.len(), 2);
        assert_eq!(info.vos["testvo"].used, 100 + 500 + 1);
        assert_eq!(info.vos["testvo"].nearline, 40_000);
        assert_eq!(info.vos["dteam"].used, 1);
        assert!(!info.vos.contains_key("*"));
        assert_eq!(info.summary.used, 100 + 500 + 30 + 1);
    }

    #[test]
    fn test_duplicate_vfs_rejected() {
        let result = SpaceInfo::from_vfs(vec![
            vfs("TESTVO-FS", &["testvo"], space(1_000, 100, 0)),
            vfs("TESTVO-FS", &["testvo"], space(1_000, 100, 0)),
        ]);
        assert!(matches!(result, Err(Error::DuplicateStorageArea { name }) if name == "TESTVO-FS"));
    }

    #[test]
    fn test_storage_class_derivation() {
        assert_eq!(RetentionPolicy::from_storage_class("T1D0"), RetentionPolicy::Custodial);
        assert_eq!(RetentionPolicy::from_storage_class("T0D1"), RetentionPolicy::Replica);
        assert_eq!(AccessLatency::from_storage_class("T1D0"), AccessLatency::Nearline);
        assert_eq!(AccessLatency::from_storage_class("T1D1"), AccessLatency::Online);
        assert_eq!("REPLICA".parse::<RetentionPolicy>().unwrap(), RetentionPolicy::Replica);
        assert_eq!("ONLINE".parse::<AccessLatency>().unwrap(), AccessLatency::Online);
        assert!("sometimes".parse::<AccessLatency>().is_err());
    }

    #[test]
    fn test_vfs_naming_helpers() {
        let record = vfs("TESTVO-FS", &["testvo"], SpaceRecord::default());
        assert_eq!(record.short_name(), "TESTVO");
        assert_eq!(record.primary_path(), "/testvo");
        assert!(!record.is_anonymous());
        assert!(vfs("NOAUTH-FS", &["*"], SpaceRecord::default()).is_anonymous());
        assert_eq!(short_vfs_name("plain"), "plain");
    }
}
