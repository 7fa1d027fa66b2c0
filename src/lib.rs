//! StoRM Info Provider
//!
//! Publishes the storage layout and usage of a StoRM service as GLUE 1.3 and
//! GLUE 2 LDIF records, plus a JSON storage service report.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                          InfoProvider                             │
//! │      configure · get-static-ldif · get-update-ldif · report       │
//! ├───────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────┐   ┌────────────────┐   ┌────────────────────┐  │
//! │  │ Configuration │──▶│ SpaceInfo      │──▶│ GLUE 1.3 / GLUE 2  │  │
//! │  │ (YAML file)   │   │ Builder        │   │ record mappers     │  │
//! │  └───────────────┘   └───────┬────────┘   └─────────┬──────────┘  │
//! │                              │                      │             │
//! │                      ┌───────┴────────┐   ┌─────────┴──────────┐  │
//! │                      │ BackendGateway │   │ LDIF export        │  │
//! │                      │ (REST + retry) │   │ (stdout / files)   │  │
//! │                      └────────────────┘   └────────────────────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`config`]: Site configuration and storage area facts
//! - [`domain`]: Backend payloads and the gateway port
//! - [`gateway`]: HTTP adapter for the backend REST services
//! - [`space`]: Space records and their aggregation
//! - [`glue`]: GLUE 1.3 and GLUE 2 record mappers
//! - [`ldif`]: Directory records and LDIF serialization
//! - [`report`]: JSON storage service report
//! - [`provider`]: The operations tying everything together
//! - [`error`]: Error types and handling

pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod glue;
pub mod ldif;
pub mod provider;
pub mod report;
pub mod space;

// Re-export commonly used types
pub use config::{Configuration, ConfigurationSource, QualityLevel, ServingState, StorageArea};

pub use domain::ports::{BackendGateway, SaStatus, VfsDescriptor, VfsWithStatus};

pub use error::{Error, ErrorCategory, FailureClass, Result};

pub use gateway::{GatewayConfig, RetryPolicy, StormGateway};

pub use glue::{Glue13, Glue2, GlueSchema, GlueVersion};

pub use ldif::{Attributes, DirectoryExport, DirectoryRecord};

pub use provider::{InfoProvider, ProviderOptions};

pub use report::StorageServiceReport;

pub use space::{SpaceInfo, SpaceInfoBuilder, SpaceRecord, VirtualFileSystemRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
