// src/pipeline/catalog.rs

//! Catalog service: the single writer of the in-memory catalog.
//!
//! Every committed mutation (user edit or reconciliation run) is published
//! to subscribers first and then persisted with exactly one store write. A
//! failed write is reported but the in-memory catalog keeps the change, so
//! the next successful save carries it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::{Catalog, Entry, EntryDraft, SyncConfig};
use crate::pipeline::reconcile::{ReconcileReport, Reconciler, SourceBatch, fetch_all};
use crate::sources::SourceAdapter;
use crate::storage::CatalogStore;

/// Owns the catalog and serializes every mutation of it.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    catalog: Catalog,
    publisher: watch::Sender<Arc<Catalog>>,
}

impl CatalogService {
    /// Open the catalog from the store.
    ///
    /// A missing document is replaced by the sample catalog (and saved); a
    /// corrupt or unreadable one degrades to an empty catalog.
    pub async fn open(store: Arc<dyn CatalogStore>) -> Self {
        let catalog = match store.load().await {
            Ok(Some(entries)) => {
                log::info!("Loaded {} entries from {}", entries.len(), store.location());
                Catalog::from_entries(entries)
            }
            Ok(None) => {
                log::info!("No catalog at {}, creating sample entries", store.location());
                let catalog = seed_catalog();
                if let Err(e) = store.save(catalog.entries()).await {
                    log::warn!("Could not save sample catalog: {}", e);
                }
                catalog
            }
            Err(e) => {
                log::warn!("{}. Starting with an empty catalog.", e);
                Catalog::new()
            }
        };

        Self::with_catalog(store, catalog)
    }

    /// Wrap an already-loaded catalog without touching the store.
    pub fn with_catalog(store: Arc<dyn CatalogStore>, catalog: Catalog) -> Self {
        let (publisher, _) = watch::channel(Arc::new(catalog.clone()));
        Self {
            store,
            catalog,
            publisher,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get(&self, id: u64) -> Option<&Entry> {
        self.catalog.get(id)
    }

    /// Receiver that always holds the latest committed catalog.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Catalog>> {
        self.publisher.subscribe()
    }

    /// Create an entry dated today.
    pub async fn create(&mut self, draft: EntryDraft) -> Result<Entry> {
        self.create_dated(draft, Local::now().date_naive()).await
    }

    pub async fn create_dated(&mut self, draft: EntryDraft, date: NaiveDate) -> Result<Entry> {
        let entry = self.catalog.create(&draft, date)?;
        log::info!("Created entry {} '{}'", entry.id, entry.title);
        self.commit().await?;
        Ok(entry)
    }

    /// Replace title, category and content of an entry.
    pub async fn edit(&mut self, id: u64, draft: EntryDraft) -> Result<Entry> {
        let entry = self.catalog.update(id, &draft)?;
        log::info!("Updated entry {}", id);
        self.commit().await?;
        Ok(entry)
    }

    pub async fn delete(&mut self, id: u64) -> Result<Entry> {
        let entry = self.catalog.remove(id)?;
        log::info!("Deleted entry {} '{}'", id, entry.title);
        self.commit().await?;
        Ok(entry)
    }

    /// Merge already-fetched batches and persist once.
    ///
    /// A failed save does not discard the run: the merged catalog stays in
    /// memory and the report carries the error in `save_error`.
    pub async fn reconcile(&mut self, batches: Vec<SourceBatch>) -> ReconcileReport {
        let (merged, mut report) = Reconciler::new().merge(&self.catalog, batches);
        log::info!(
            "Reconciled: {} added, {} duplicates, {} failed sources",
            report.added,
            report.duplicates,
            report.failure_count()
        );

        self.catalog = merged;
        report.save_error = match self.commit().await {
            Ok(()) => None,
            Err(AppError::StoreWrite { message, .. }) => Some(message),
            Err(e) => Some(e.to_string()),
        };
        report
    }

    /// Fetch all sources and reconcile them as one run.
    pub async fn sync(
        &mut self,
        sources: &[Box<dyn SourceAdapter>],
        config: &SyncConfig,
    ) -> Result<ReconcileReport> {
        if sources.is_empty() {
            return Err(AppError::config("no sources configured"));
        }

        let timeout = Duration::from_secs(config.timeout_secs);
        let batches = fetch_all(sources, timeout, config.max_concurrent).await;
        Ok(self.reconcile(batches).await)
    }

    async fn commit(&mut self) -> Result<()> {
        self.publisher.send_replace(Arc::new(self.catalog.clone()));
        self.store.save(self.catalog.entries()).await.inspect_err(|e| {
            log::error!("{}. Changes are kept in memory until the next save.", e);
        })
    }
}

/// Sample entries for a first run.
pub fn seed_catalog() -> Catalog {
    let date = NaiveDate::from_ymd_opt(2026, 1, 19).unwrap_or(NaiveDate::MIN);
    let entry = |id: u64, title: &str, category: &str, content: &str| Entry {
        id,
        title: title.to_string(),
        category: category.to_string(),
        content: content.to_string(),
        date,
    };

    Catalog::from_entries(vec![
        entry(
            1,
            "Python",
            "Programming",
            "Python is a high-level general-purpose programming language. Its simple, readable \
             syntax makes it a good first language.",
        ),
        entry(
            2,
            "Kivy",
            "Programming",
            "Kivy is a Python framework for cross-platform applications. It targets Windows, \
             Linux, macOS, Android and iOS.",
        ),
        entry(
            3,
            "JSON",
            "Data Formats",
            "JSON (JavaScript Object Notation) is a text data-interchange format derived from \
             JavaScript. It is easy for both people and machines to read.",
        ),
    ])
}
