// src/models/mod.rs

//! Domain models for the catalog.
//!
//! This module contains the data structures shared by storage, sources,
//! reconciliation and the live view.

mod catalog;
mod config;
mod entry;

// Re-export all public types
pub use catalog::Catalog;
pub use config::{
    Config, FetchMode, LoggingConfig, PresentationConfig, SourceConfig, StorageConfig, SyncConfig,
};
pub use entry::{CandidateEntry, DEFAULT_CATEGORY, Entry, EntryDraft, normalize_title};
