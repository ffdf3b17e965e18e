//! Source adapters for remote catalog content.
//!
//! Every adapter turns one origin into candidate entries or fails as a whole.
//! Page-structure knowledge stays inside the adapter:
//! - `SnapshotSource`: JSON catalog snapshot
//! - `PythonBlogSource`: python.org blog listing
//! - `HackerNewsSource`: Hacker News front page, shallow or deep

mod hacker_news;
mod python_blog;
mod snapshot;

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use scraper::Selector;

use crate::error::{AppError, Result};
use crate::models::{CandidateEntry, Config, SourceConfig};

pub use hacker_news::HackerNewsSource;
pub use python_blog::PythonBlogSource;
pub use snapshot::SnapshotSource;

/// A producer of candidate entries from one origin.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable name used in reports and logs.
    fn name(&self) -> &str;

    /// Fetch candidates in source order.
    async fn fetch(&self) -> Result<Vec<CandidateEntry>>;
}

/// Build adapters for every configured source, in configuration order.
pub fn build_sources(config: &Config, client: &reqwest::Client) -> Vec<Box<dyn SourceAdapter>> {
    let request_delay = Duration::from_millis(config.sync.request_delay_ms);
    let article_timeout = Duration::from_millis(config.sync.article_timeout_ms);
    let time_budget = Duration::from_secs(config.sync.timeout_secs);

    config
        .sources
        .iter()
        .map(|source| -> Box<dyn SourceAdapter> {
            match source {
                SourceConfig::Snapshot { name, url } => {
                    Box::new(SnapshotSource::new(name, url, client.clone()))
                }
                SourceConfig::PythonBlog {
                    name,
                    url,
                    category,
                } => Box::new(PythonBlogSource::new(name, url, category, client.clone())),
                SourceConfig::HackerNews {
                    name,
                    url,
                    category,
                    limit,
                    fetch_mode,
                    excerpt_chars,
                } => Box::new(
                    HackerNewsSource::new(name, url, category, client.clone())
                        .with_limit(*limit)
                        .with_fetch_mode(*fetch_mode, request_delay)
                        .with_article_timeout(article_timeout)
                        .with_time_budget(time_budget)
                        .with_excerpt_chars(*excerpt_chars),
                ),
            }
        })
        .collect()
}

pub(crate) fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("static date pattern is valid")
});

/// Extract the first ISO calendar date found in a timestamp string.
pub(crate) fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let caps = ISO_DATE.captures(text)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}
