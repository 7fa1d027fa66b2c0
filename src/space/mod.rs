//! Space Accounting
//!
//! Space records for storage areas and VOs, and the aggregator that builds
//! a snapshot from the backend or, failing that, from the configuration.

pub mod aggregator;
pub mod record;

pub use aggregator::SpaceInfoBuilder;
pub use record::{
    short_vfs_name, AccessLatency, RetentionPolicy, SpaceInfo, SpaceRecord,
    VirtualFileSystemRecord, ANONYMOUS_VO,
};
