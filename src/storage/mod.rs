//! Storage abstractions for catalog persistence.
//!
//! The store is a dumb holder of the entry set: it loads and saves the
//! persisted document and carries no query or merge logic.
//!
//! ## Document Format
//!
//! ```text
//! [
//!   { "id": 1, "title": "Python", "category": "Programming",
//!     "content": "...", "date": "2026-01-19" },
//!   ...
//! ]
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Entry;

// Re-export for convenience
pub use local::LocalStorage;

/// Trait for catalog storage backends.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load the persisted entries.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet and
    /// `AppError::StoreCorrupt` when a document exists but cannot be parsed.
    async fn load(&self) -> Result<Option<Vec<Entry>>>;

    /// Persist the full entry set, replacing the previous document.
    ///
    /// Fails with `AppError::StoreWrite`; callers keep their in-memory state.
    async fn save(&self, entries: &[Entry]) -> Result<()>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}
