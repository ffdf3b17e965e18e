//! Local filesystem storage implementation.
//!
//! Keeps the catalog as a single pretty-printed UTF-8 JSON document. Writes go
//! to a sibling temp file that is renamed over the target, so a crash mid-save
//! leaves either the old or the new document on disk.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Entry;
use crate::storage::CatalogStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage for the given document path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn corrupt(&self, message: impl ToString) -> AppError {
        AppError::StoreCorrupt {
            path: self.path.display().to_string(),
            message: message.to_string(),
        }
    }

    fn write_failed(&self, error: std::io::Error) -> AppError {
        AppError::StoreWrite {
            path: self.path.display().to_string(),
            message: error.to_string(),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

/// Check a loaded document against the catalog invariants.
///
/// Broken ids make the document unusable and are returned as `Err`. Blank
/// or repeated titles are tolerated and returned as warnings.
fn check_entries(entries: &[Entry]) -> std::result::Result<Vec<String>, String> {
    let mut ids = HashSet::new();
    let mut titles = HashSet::new();
    let mut warnings = Vec::new();

    for entry in entries {
        match entry.id {
            0 => return Err("id 0 is not a valid id".to_string()),
            u64::MAX => return Err(format!("id {} leaves no id to allocate", entry.id)),
            id if !ids.insert(id) => return Err(format!("duplicate id {id}")),
            _ => {}
        }

        if entry.title.trim().is_empty() {
            warnings.push(format!("entry {} has a blank title", entry.id));
        } else if !titles.insert(entry.title_key()) {
            warnings.push(format!(
                "entry {} repeats the title '{}'",
                entry.id,
                entry.title.trim()
            ));
        }
    }
    Ok(warnings)
}

#[async_trait]
impl CatalogStore for LocalStorage {
    async fn load(&self) -> Result<Option<Vec<Entry>>> {
        let Some(bytes) = self.read_bytes().await? else {
            return Ok(None);
        };

        let entries: Vec<Entry> =
            serde_json::from_slice(&bytes).map_err(|e| self.corrupt(e))?;

        let warnings = check_entries(&entries).map_err(|e| self.corrupt(e))?;
        for warning in warnings {
            log::warn!("{}: {}", self.path.display(), warning);
        }

        log::debug!("Loaded {} entries from {}", entries.len(), self.path.display());
        Ok(Some(entries))
    }

    async fn save(&self, entries: &[Entry]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        self.write_bytes(&bytes)
            .await
            .map_err(|e| self.write_failed(e))?;
        log::debug!("Saved {} entries to {}", entries.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
