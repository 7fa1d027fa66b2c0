//! LDIF Directory Records
//!
//! Generic record model shared by the GLUE mappers, and its serializer.

pub mod export;
pub mod record;

pub use export::{DirectoryExport, DEFAULT_FOLD_WIDTH};
pub use record::{Attributes, DirectoryRecord, IntoValues};
