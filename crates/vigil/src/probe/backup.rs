//! Backup catalog probes.
//!
//! A catalog lists backup items (bucket objects, database snapshots, machine
//! images); what counts as "available" is decided by each catalog when it
//! builds its items, the judgement itself is shared.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::CheckError;

/// Default maximum age of the newest backup
pub const DEFAULT_MIN_AGE: Duration = Duration::from_secs(36 * 3600);

/// Default size floor for bucket backups
pub const DEFAULT_MIN_SIZE: u64 = 1024 * 1024;

/// One entry of a backup catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupItem {
    pub created_at: DateTime<Utc>,
    /// Size in bytes, when the catalog knows it
    pub size: Option<u64>,
    /// Whether the item is complete and usable
    pub available: bool,
}

impl BackupItem {
    pub fn available(created_at: DateTime<Utc>, size: Option<u64>) -> Self {
        Self { created_at, size, available: true }
    }
}

/// Thresholds applied to the newest available backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupPolicy {
    pub min_age: Duration,
    pub min_size: Option<u64>,
}

impl Default for BackupPolicy {
    fn default() -> Self {
        Self { min_age: DEFAULT_MIN_AGE, min_size: None }
    }
}

impl BackupPolicy {
    /// Defaults for bucket backups, which also enforce a size floor
    pub fn bucket() -> Self {
        Self { min_size: Some(DEFAULT_MIN_SIZE), ..Self::default() }
    }
}

/// Source of backup items for one target
#[async_trait::async_trait]
pub trait BackupCatalog: Send + Sync {
    /// Identifier reported as the result endpoint
    fn endpoint(&self) -> &str;

    /// List the items of the catalog. Failing to reach the catalog at all is
    /// a setup error, not an unhealthy backup.
    async fn list(&self) -> Result<Vec<BackupItem>, CheckError>;
}

/// Backups stored as files in a local directory
///
/// Every regular file whose name starts with `prefix` is an available item,
/// dated by its modification time.
pub struct DirectoryCatalog {
    endpoint: String,
    path: PathBuf,
    prefix: String,
}

impl DirectoryCatalog {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let path = path.into();
        Self { endpoint: path.display().to_string(), path, prefix: prefix.into() }
    }

    fn catalog_error(&self, reason: impl ToString) -> CheckError {
        CheckError::Catalog { catalog: self.endpoint.clone(), reason: reason.to_string() }
    }
}

#[async_trait::async_trait]
impl BackupCatalog for DirectoryCatalog {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn list(&self) -> Result<Vec<BackupItem>, CheckError> {
        let mut entries = tokio::fs::read_dir(&self.path).await.map_err(|e| self.catalog_error(e))?;
        let mut items = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(|e| self.catalog_error(e))? {
            if !entry.file_name().to_string_lossy().starts_with(&self.prefix) {
                continue;
            }
            let metadata = entry.metadata().await.map_err(|e| self.catalog_error(e))?;
            if !metadata.is_file() {
                continue;
            }
            let modified = metadata.modified().map_err(|e| self.catalog_error(e))?;
            items.push(BackupItem::available(DateTime::<Utc>::from(modified), Some(metadata.len())));
        }

        Ok(items)
    }
}
