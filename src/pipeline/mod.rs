//! Catalog pipeline.
//!
//! - `catalog`: the single writer that commits and persists mutations
//! - `reconcile`: fetch fan-out and merge of source candidates

pub mod catalog;
pub mod reconcile;

pub use catalog::{CatalogService, seed_catalog};
pub use reconcile::{
    ReconcileReport, Reconciler, SourceBatch, SourceFailure, SourceSummary, fetch_all,
};
