//! Entry data structures.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Category assigned when none is given.
pub const DEFAULT_CATEGORY: &str = "General";

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Normalize a title into its duplicate key (trimmed, case-folded).
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// A persisted catalog record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    /// Stable unique identifier
    pub id: u64,

    /// Entry title
    pub title: String,

    /// Free-text category label
    #[serde(default = "default_category")]
    pub category: String,

    /// Body text
    #[serde(default)]
    pub content: String,

    /// Creation date (ISO `YYYY-MM-DD`)
    pub date: NaiveDate,
}

impl Entry {
    /// Duplicate key for this entry.
    pub fn title_key(&self) -> String {
        normalize_title(&self.title)
    }

    /// Format entry for display using a template.
    ///
    /// Supported placeholders: `{id}`, `{title}`, `{category}`, `{content}`, `{date}`
    pub fn format(&self, template: &str) -> String {
        template
            .replace("{id}", &self.id.to_string())
            .replace("{title}", &self.title)
            .replace("{category}", &self.category)
            .replace("{content}", &self.content)
            .replace("{date}", &self.date.to_string())
    }
}

/// An entry proposed by a source, not yet assigned an id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateEntry {
    pub title: String,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub content: String,

    pub date: NaiveDate,
}

impl CandidateEntry {
    /// Turn the candidate into an entry with the given id.
    pub fn into_entry(self, id: u64) -> Entry {
        Entry {
            id,
            title: self.title,
            category: self.category,
            content: self.content,
            date: self.date,
        }
    }
}

/// User-supplied fields for creating or editing an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDraft {
    pub title: String,
    pub category: String,
    pub content: String,
}

impl EntryDraft {
    pub fn new(
        title: impl Into<String>,
        category: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            category: category.into(),
            content: content.into(),
        }
    }

    /// Reject drafts that must not reach the store.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation("title must not be empty"));
        }
        Ok(())
    }

    /// Category with blank input replaced by the default.
    pub fn category_or_default(&self) -> String {
        let category = self.category.trim();
        if category.is_empty() {
            default_category()
        } else {
            category.to_string()
        }
    }
}
