//! The ordered entry collection.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::entry::{CandidateEntry, Entry, EntryDraft, normalize_title};
use crate::error::{AppError, Result};

/// Ordered collection of all entries.
///
/// `high_water` is the largest id ever held. It never drops below
/// `max(id)`, so an id freed by deletion is not handed out again while this
/// value lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<Entry>,
    high_water: u64,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            high_water: 0,
        }
    }

    /// Build a catalog from entries in their persisted order.
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        let high_water = entries.iter().map(|e| e.id).max().unwrap_or(0);
        Self {
            entries,
            high_water,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest id present, or 0 for an empty catalog.
    pub fn max_id(&self) -> u64 {
        self.entries.iter().map(|e| e.id).max().unwrap_or(0)
    }

    /// Id the next created entry will receive, if any is left.
    pub fn next_id(&self) -> Option<u64> {
        self.high_water.checked_add(1)
    }

    pub fn get(&self, id: u64) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Normalized titles of every entry.
    pub fn title_keys(&self) -> HashSet<String> {
        self.entries.iter().map(Entry::title_key).collect()
    }

    /// Whether another entry (ignoring `except`) already uses this title.
    pub fn has_title(&self, title: &str, except: Option<u64>) -> bool {
        let key = normalize_title(title);
        self.entries
            .iter()
            .any(|e| Some(e.id) != except && e.title_key() == key)
    }

    fn allocate_id(&mut self) -> Result<u64> {
        let id = self.next_id().ok_or(AppError::IdExhausted)?;
        self.high_water = id;
        Ok(id)
    }

    /// Append a candidate under a freshly allocated id.
    ///
    /// Does not check the duplicate key; callers own that decision.
    pub fn push_candidate(&mut self, candidate: CandidateEntry) -> Result<u64> {
        let id = self.allocate_id()?;
        self.entries.push(candidate.into_entry(id));
        Ok(id)
    }

    /// Create an entry from user input.
    pub fn create(&mut self, draft: &EntryDraft, date: NaiveDate) -> Result<Entry> {
        draft.validate()?;
        if self.has_title(&draft.title, None) {
            return Err(AppError::validation(format!(
                "an entry titled '{}' already exists",
                draft.title.trim()
            )));
        }

        let candidate = CandidateEntry {
            title: draft.title.trim().to_string(),
            category: draft.category_or_default(),
            content: draft.content.clone(),
            date,
        };
        let id = self.push_candidate(candidate)?;
        self.get(id).cloned().ok_or(AppError::NotFound(id))
    }

    /// Replace the editable fields of an entry; id and date are kept.
    pub fn update(&mut self, id: u64, draft: &EntryDraft) -> Result<Entry> {
        draft.validate()?;
        if self.has_title(&draft.title, Some(id)) {
            return Err(AppError::validation(format!(
                "an entry titled '{}' already exists",
                draft.title.trim()
            )));
        }

        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(AppError::NotFound(id))?;
        entry.title = draft.title.trim().to_string();
        entry.category = draft.category_or_default();
        entry.content = draft.content.clone();
        Ok(entry.clone())
    }

    /// Remove an entry by id.
    pub fn remove(&mut self, id: u64) -> Result<Entry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or(AppError::NotFound(id))?;
        Ok(self.entries.remove(pos))
    }
}
