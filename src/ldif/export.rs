//! LDIF Export
//!
//! Serializes an ordered list of [`DirectoryRecord`]s to LDIF and writes
//! full dumps to disk with backup rotation.

use super::record::DirectoryRecord;
use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Local};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default column at which LDIF lines are folded
pub const DEFAULT_FOLD_WIDTH: usize = 512;

/// Suffix of the backup left by an overwriting dump
const BACKUP_SUFFIX: &str = ".bkp_";

/// Suffix of the file written when overwriting is disabled
const NEW_FILE_SUFFIX: &str = ".yaimnew_";

/// Suffix of the file a dump is staged in before it is renamed into place
const STAGING_SUFFIX: &str = ".tmp_";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// =============================================================================
// Directory Export
// =============================================================================

/// Ordered collection of records ready to be serialized
#[derive(Debug, Clone)]
pub struct DirectoryExport {
    records: Vec<DirectoryRecord>,
    fold_width: usize,
}

impl Default for DirectoryExport {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryExport {
    pub fn new() -> Self {
        Self::with_fold_width(DEFAULT_FOLD_WIDTH)
    }

    pub fn with_fold_width(fold_width: usize) -> Self {
        Self {
            records: Vec::new(),
            fold_width: fold_width.max(2),
        }
    }

    pub fn push(&mut self, record: DirectoryRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize all records, in order
    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for record in &self.records {
            self.write_line(out, "dn", record.dn())?;
            for (name, values) in record.attributes().iter() {
                for value in values {
                    self.write_line(out, name, value)?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Serialize all records into a string
    pub fn to_ldif(&self) -> std::io::Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    fn write_line<W: Write>(&self, out: &mut W, name: &str, value: &str) -> std::io::Result<()> {
        let line = if needs_base64(value) {
            format!("{}:: {}", name, BASE64.encode(value.as_bytes()))
        } else {
            format!("{}: {}", name, value)
        };
        for (i, chunk) in fold(&line, self.fold_width).into_iter().enumerate() {
            if i > 0 {
                out.write_all(b" ")?;
            }
            out.write_all(chunk.as_bytes())?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    // =========================================================================
    // Static Dumps
    // =========================================================================

    /// Write a full dump to `path`.
    ///
    /// Stale `<name>.bkp_*` files are removed first. The content goes to
    /// `<name>.tmp_<timestamp>` and is renamed into place once complete.
    /// With `overwrite`, an existing file is renamed to
    /// `<name>.bkp_<timestamp>` and replaced; without it, the dump lands in
    /// `<name>.yaimnew_<timestamp>` and the existing file is left alone.
    /// Returns the path written.
    pub async fn save_static(
        &self,
        path: &Path,
        overwrite: bool,
        now: DateTime<Local>,
    ) -> Result<PathBuf> {
        let content = self.to_ldif()?;
        let timestamp = now.format(TIMESTAMP_FORMAT).to_string();

        remove_backups(path).await?;

        let exists = fs::try_exists(path)
            .await
            .map_err(|e| Error::file_system(path, e))?;
        let target = if exists && !overwrite {
            with_suffix(path, NEW_FILE_SUFFIX, &timestamp)
        } else {
            path.to_path_buf()
        };

        let staging = with_suffix(path, STAGING_SUFFIX, &timestamp);
        if let Err(e) = fs::write(&staging, content).await {
            let _ = fs::remove_file(&staging).await;
            return Err(Error::file_system(&staging, e));
        }

        if exists && overwrite {
            let backup = with_suffix(path, BACKUP_SUFFIX, &timestamp);
            debug!("Backup {} to {}", path.display(), backup.display());
            if let Err(e) = fs::rename(path, &backup).await {
                let _ = fs::remove_file(&staging).await;
                return Err(Error::file_system(path, e));
            }
        }

        fs::rename(&staging, &target)
            .await
            .map_err(|e| Error::file_system(&target, e))?;
        info!("{} records written to {}", self.records.len(), target.display());
        Ok(target)
    }
}

impl Extend<DirectoryRecord> for DirectoryExport {
    fn extend<I: IntoIterator<Item = DirectoryRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl FromIterator<DirectoryRecord> for DirectoryExport {
    fn from_iter<I: IntoIterator<Item = DirectoryRecord>>(iter: I) -> Self {
        let mut export = Self::new();
        export.extend(iter);
        export
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Whether a value must be base64 encoded to be a valid LDIF safe-string
fn needs_base64(value: &str) -> bool {
    let bytes = value.as_bytes();
    match bytes.first() {
        None => return false,
        Some(b'\0' | b'\n' | b'\r' | b' ' | b':' | b'<') => return true,
        Some(_) => {}
    }
    if bytes.last() == Some(&b' ') {
        return true;
    }
    bytes
        .iter()
        .any(|b| matches!(b, b'\0' | b'\n' | b'\r') || !b.is_ascii())
}

/// Split a line into chunks: `width` characters, then `width - 1` per
/// continuation line (the leading space takes the last column)
fn fold(line: &str, width: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = line;
    let mut limit = width;
    while rest.len() > limit {
        let mut split = limit;
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        let (head, tail) = rest.split_at(split);
        chunks.push(head);
        rest = tail;
        limit = width - 1;
    }
    chunks.push(rest);
    chunks
}

fn with_suffix(path: &Path, suffix: &str, timestamp: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    name.push(timestamp);
    PathBuf::from(name)
}

async fn remove_backups(path: &Path) -> Result<()> {
    let pattern = format!(
        "{}{}*",
        glob::Pattern::escape(&path.to_string_lossy()),
        BACKUP_SUFFIX
    );
    for entry in glob::glob(&pattern)? {
        let backup = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            Error::file_system(path, e.into_error())
        })?;
        debug!("Removing old backup {}", backup.display());
        fs::remove_file(&backup)
            .await
            .map_err(|e| Error::file_system(&backup, e))?;
    }
    Ok(())
}
