//! GLUE Schema Mappers
//!
//! Map a [`SpaceInfo`] snapshot and the configuration to ordered directory
//! records, in one of the two published GLUE dialects.

pub mod glue13;
pub mod glue2;
pub mod units;

pub use glue13::Glue13;
pub use glue2::Glue2;

use crate::config::Configuration;
use crate::error::Result;
use crate::ldif::DirectoryRecord;
use crate::space::SpaceInfo;
use chrono::{DateTime, Utc};
use std::fmt;

/// A GLUE dialect
pub trait GlueSchema {
    /// Short name, e.g. `glue2`
    fn name(&self) -> &'static str;

    /// File name of the static dump
    fn static_ldif_file_name(&self) -> &'static str;

    /// Full records describing the service
    fn static_records(&self, space: &SpaceInfo) -> Result<Vec<DirectoryRecord>>;

    /// Patches refreshing counters and serving state.
    ///
    /// `space` is `None` when the service is closed.
    fn update_records(&self, space: Option<&SpaceInfo>) -> Result<Vec<DirectoryRecord>>;
}

/// Dialect selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum GlueVersion {
    Glue13,
    Glue2,
    All,
}

impl GlueVersion {
    /// Instantiate the selected mappers, GLUE 1.3 first
    pub fn schemas<'a>(
        &self,
        configuration: &'a Configuration,
        created_at: DateTime<Utc>,
    ) -> Vec<Box<dyn GlueSchema + 'a>> {
        let mut schemas: Vec<Box<dyn GlueSchema + 'a>> = Vec::new();
        if matches!(self, GlueVersion::Glue13 | GlueVersion::All) {
            schemas.push(Box::new(Glue13::new(configuration)));
        }
        if matches!(self, GlueVersion::Glue2 | GlueVersion::All) {
            schemas.push(Box::new(Glue2::new(configuration, created_at)));
        }
        schemas
    }
}

impl fmt::Display for GlueVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlueVersion::Glue13 => write!(f, "glue13"),
            GlueVersion::Glue2 => write!(f, "glue2"),
            GlueVersion::All => write!(f, "all"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::default_configuration;

    #[test]
    fn test_schema_selection() {
        let config = default_configuration();
        let names = |version: GlueVersion| -> Vec<&'static str> {
            version
                .schemas(&config, Utc::now())
                .iter()
                .map(|s| s.name())
                .collect()
        };
        assert_eq!(names(GlueVersion::Glue13), vec!["glue13"]);
        assert_eq!(names(GlueVersion::Glue2), vec!["glue2"]);
        assert_eq!(names(GlueVersion::All), vec!["glue13", "glue2"]);
    }
}
