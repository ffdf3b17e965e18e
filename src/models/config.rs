//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Persisted catalog location
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP and synchronization behavior settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Batching and debounce settings for the live view
    #[serde(default)]
    pub presentation: PresentationConfig,

    /// Logging defaults
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote sources reconciled into the catalog, in merge order
    #[serde(default = "defaults::sources")]
    pub sources: Vec<SourceConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_file.as_os_str().is_empty() {
            return Err(AppError::validation("storage.data_file is empty"));
        }
        if self.sync.user_agent.trim().is_empty() {
            return Err(AppError::validation("sync.user_agent is empty"));
        }
        if self.sync.timeout_secs == 0 {
            return Err(AppError::validation("sync.timeout_secs must be > 0"));
        }
        if self.sync.article_timeout_ms == 0 {
            return Err(AppError::validation("sync.article_timeout_ms must be > 0"));
        }
        if self.sync.max_concurrent == 0 {
            return Err(AppError::validation("sync.max_concurrent must be > 0"));
        }
        if self.presentation.batch_size == 0 {
            return Err(AppError::validation("presentation.batch_size must be > 0"));
        }

        let mut names = HashSet::new();
        for source in &self.sources {
            if source.url().trim().is_empty() {
                return Err(AppError::validation(format!(
                    "source '{}' has an empty url",
                    source.name()
                )));
            }
            if !names.insert(source.name()) {
                return Err(AppError::validation(format!(
                    "duplicate source name '{}'",
                    source.name()
                )));
            }
        }
        Ok(())
    }

    /// Resolve the catalog document path against a storage directory.
    pub fn data_path(&self, storage_dir: &Path) -> PathBuf {
        storage_dir.join(&self.storage.data_file)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            sync: SyncConfig::default(),
            presentation: PresentationConfig::default(),
            logging: LoggingConfig::default(),
            sources: defaults::sources(),
        }
    }
}

/// Where the catalog document lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Catalog document, relative to the storage directory
    #[serde(default = "defaults::data_file")]
    pub data_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: defaults::data_file(),
        }
    }
}

/// HTTP client and synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Upper bound for one source's fetch, in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between per-article requests in deep fetch mode
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Upper bound for one article request in deep fetch mode
    #[serde(default = "defaults::article_timeout")]
    pub article_timeout_ms: u64,

    /// Maximum sources fetched concurrently
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            article_timeout_ms: defaults::article_timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Live view settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Entries per delivered batch
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Pause between batches in milliseconds (0 only yields)
    #[serde(default = "defaults::batch_interval")]
    pub batch_interval_ms: u64,

    /// Quiet period before search text is committed
    #[serde(default = "defaults::debounce")]
    pub debounce_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::batch_size(),
            batch_interval_ms: defaults::batch_interval(),
            debounce_ms: defaults::debounce(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// How much work the Hacker News source does per story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Listing page only
    #[default]
    Shallow,
    /// Listing page plus one request per story
    Deep,
}

/// A remote source definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// JSON snapshot of a catalog
    Snapshot {
        #[serde(default = "defaults::snapshot_name")]
        name: String,
        #[serde(default = "defaults::snapshot_url")]
        url: String,
    },
    /// Official Python blog listing
    PythonBlog {
        #[serde(default = "defaults::python_blog_name")]
        name: String,
        #[serde(default = "defaults::python_blog_url")]
        url: String,
        #[serde(default = "defaults::python_blog_category")]
        category: String,
    },
    /// Hacker News front page
    HackerNews {
        #[serde(default = "defaults::hacker_news_name")]
        name: String,
        #[serde(default = "defaults::hacker_news_url")]
        url: String,
        #[serde(default = "defaults::hacker_news_category")]
        category: String,
        #[serde(default = "defaults::hacker_news_limit")]
        limit: usize,
        #[serde(default)]
        fetch_mode: FetchMode,
        #[serde(default = "defaults::excerpt_chars")]
        excerpt_chars: usize,
    },
}

impl SourceConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Snapshot { name, .. }
            | Self::PythonBlog { name, .. }
            | Self::HackerNews { name, .. } => name,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Snapshot { url, .. }
            | Self::PythonBlog { url, .. }
            | Self::HackerNews { url, .. } => url,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::{FetchMode, SourceConfig};

    // Storage defaults
    pub fn data_file() -> PathBuf {
        PathBuf::from("data.json")
    }

    // Sync defaults
    pub fn user_agent() -> String {
        format!("refcat/{}", env!("CARGO_PKG_VERSION"))
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        500
    }
    pub fn article_timeout() -> u64 {
        5_000
    }
    pub fn max_concurrent() -> usize {
        4
    }

    // Presentation defaults
    pub fn batch_size() -> usize {
        20
    }
    pub fn batch_interval() -> u64 {
        50
    }
    pub fn debounce() -> u64 {
        300
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }

    // Source defaults
    pub fn snapshot_name() -> String {
        "snapshot".into()
    }
    pub fn snapshot_url() -> String {
        "https://raw.githubusercontent.com/igris2212/project-on-college/refs/heads/main/data.json"
            .into()
    }
    pub fn python_blog_name() -> String {
        "python_blog".into()
    }
    pub fn python_blog_url() -> String {
        "https://www.python.org/blogs/".into()
    }
    pub fn python_blog_category() -> String {
        "Programming Languages".into()
    }
    pub fn hacker_news_name() -> String {
        "hacker_news".into()
    }
    pub fn hacker_news_url() -> String {
        "https://news.ycombinator.com/".into()
    }
    pub fn hacker_news_category() -> String {
        "IT News".into()
    }
    pub fn hacker_news_limit() -> usize {
        15
    }
    pub fn excerpt_chars() -> usize {
        400
    }

    pub fn sources() -> Vec<SourceConfig> {
        vec![
            SourceConfig::Snapshot {
                name: snapshot_name(),
                url: snapshot_url(),
            },
            SourceConfig::PythonBlog {
                name: python_blog_name(),
                url: python_blog_url(),
                category: python_blog_category(),
            },
            SourceConfig::HackerNews {
                name: hacker_news_name(),
                url: hacker_news_url(),
                category: hacker_news_category(),
                limit: hacker_news_limit(),
                fetch_mode: FetchMode::Shallow,
                excerpt_chars: excerpt_chars(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.sync.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_article_timeout() {
        let mut config = Config::default();
        config.sync.article_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.presentation.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_source_names() {
        let mut config = Config::default();
        let first = config.sources[0].clone();
        config.sources.push(first);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [presentation]
            batch_size = 5

            [[sources]]
            kind = "hacker_news"
            fetch_mode = "deep"
            limit = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.presentation.batch_size, 5);
        assert_eq!(config.presentation.debounce_ms, 300);
        assert_eq!(config.sync.timeout_secs, 30);
        assert_eq!(config.sources.len(), 1);
        match &config.sources[0] {
            SourceConfig::HackerNews {
                name,
                limit,
                fetch_mode,
                ..
            } => {
                assert_eq!(name, "hacker_news");
                assert_eq!(*limit, 3);
                assert_eq!(*fetch_mode, FetchMode::Deep);
            }
            other => panic!("unexpected source {other:?}"),
        }
    }

    #[test]
    fn empty_toml_uses_default_sources() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.sources.len(), 3);
        assert_eq!(config.sources[0].name(), "snapshot");
    }
}
