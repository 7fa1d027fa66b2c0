//! Domain layer - Ports towards external systems

pub mod ports;

pub use ports::{BackendGateway, SaStatus, VfsDescriptor, VfsWithStatus, VoNames};
