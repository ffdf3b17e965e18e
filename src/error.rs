// src/error.rs

//! Unified error handling for the catalog.

use std::fmt;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Persisted catalog exists but cannot be parsed
    #[error("Catalog at {path} is corrupt: {message}")]
    StoreCorrupt { path: String, message: String },

    /// Persisted catalog could not be written
    #[error("Failed to write catalog to {path}: {message}")]
    StoreWrite { path: String, message: String },

    /// A source could not be fetched or parsed
    #[error("Source '{source_name}' failed: {message}")]
    SourceFetch {
        source_name: String,
        message: String,
    },

    /// A source returned a well-formed payload of the wrong shape
    #[error("Source '{source_name}' returned an unexpected document: {message}")]
    SourceShape {
        source_name: String,
        message: String,
    },

    /// User input rejected before reaching the store
    #[error("Validation error: {0}")]
    Validation(String),

    /// No entry with the given id
    #[error("Entry {0} not found")]
    NotFound(u64),

    /// Every id up to `u64::MAX` has been handed out
    #[error("No ids left to allocate")]
    IdExhausted,
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a source fetch error.
    pub fn source_fetch(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SourceFetch {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Create a source shape error.
    pub fn source_shape(source_name: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::SourceShape {
            source_name: source_name.into(),
            message: message.to_string(),
        }
    }

    /// Attribute an error to a source.
    ///
    /// Source errors keep their own name and message; anything else (HTTP,
    /// URL, selector) is wrapped as a fetch failure of `source_name`.
    pub fn for_source(self, source_name: &str) -> Self {
        match self {
            Self::SourceFetch { .. } | Self::SourceShape { .. } => self,
            other => Self::source_fetch(source_name, other),
        }
    }
}
