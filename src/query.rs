// src/query.rs

//! Query engine: derives the visible set from a catalog and a query state.
//!
//! The visible set is always recomputed from scratch; it is never patched.

use std::collections::BTreeSet;

use crate::models::{Catalog, Entry};

/// Wildcard label matching every category.
pub const ALL_CATEGORIES: &str = "All";

/// Category part of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    /// Exact, case-sensitive category label
    Exact(String),
}

impl CategoryFilter {
    /// Parse a user-facing label; `"All"` is the wildcard.
    pub fn parse(label: &str) -> Self {
        if label == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Exact(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Exact(category) => category,
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Exact(expected) => expected == category,
        }
    }
}

/// Current filter and search text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    pub category: CategoryFilter,
    pub search: String,
}

impl QueryState {
    pub fn new(category: &str, search: impl Into<String>) -> Self {
        Self {
            category: CategoryFilter::parse(category),
            search: search.into(),
        }
    }
}

/// Ordered subsequence of the catalog matching a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleSet {
    entries: Vec<Entry>,
}

impl VisibleSet {
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.entries.iter().map(|e| e.id).collect()
    }
}

impl From<Vec<Entry>> for VisibleSet {
    fn from(entries: Vec<Entry>) -> Self {
        Self { entries }
    }
}

fn matches_text(entry: &Entry, needle: &str) -> bool {
    needle.is_empty()
        || entry.title.to_lowercase().contains(needle)
        || entry.content.to_lowercase().contains(needle)
}

/// Compute the visible set, preserving catalog order.
pub fn apply(catalog: &Catalog, query: &QueryState) -> VisibleSet {
    let needle = query.search.to_lowercase();
    catalog
        .iter()
        .filter(|e| query.category.matches(&e.category))
        .filter(|e| matches_text(e, &needle))
        .cloned()
        .collect::<Vec<_>>()
        .into()
}

/// Filter labels: the wildcard followed by distinct categories, sorted.
pub fn categories(catalog: &Catalog) -> Vec<String> {
    let distinct: BTreeSet<&str> = catalog.iter().map(|e| e.category.as_str()).collect();
    std::iter::once(ALL_CATEGORIES.to_string())
        .chain(distinct.into_iter().map(str::to_string))
        .collect()
}
