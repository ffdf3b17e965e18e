//! Python blog listing source.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use scraper::Html;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::CandidateEntry;
use crate::sources::{SourceAdapter, parse_iso_date, parse_selector};
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url};

/// Scrapes the recent-posts list of the official Python blog.
pub struct PythonBlogSource {
    name: String,
    url: String,
    category: String,
    client: reqwest::Client,
}

impl PythonBlogSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        category: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            category: category.into(),
            client,
        }
    }
}

#[async_trait]
impl SourceAdapter for PythonBlogSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<CandidateEntry>> {
        let base = Url::parse(&self.url)?;
        let html = fetch_text(&self.client, &self.url).await?;
        parse_listing(
            &self.name,
            &html,
            &base,
            &self.category,
            Local::now().date_naive(),
        )
    }
}

/// Extract posts from a blog listing page.
///
/// Posts without a `time[datetime]` fall back to `today`.
pub fn parse_listing(
    source_name: &str,
    html: &str,
    base: &Url,
    category: &str,
    today: NaiveDate,
) -> Result<Vec<CandidateEntry>> {
    let document = Html::parse_document(html);
    let list_sel = parse_selector("ul.list-recent-posts")?;
    let item_sel = parse_selector("li")?;
    let link_sel = parse_selector("a")?;
    let time_sel = parse_selector("time")?;

    let list = document
        .select(&list_sel)
        .next()
        .ok_or_else(|| AppError::source_shape(source_name, "no recent posts list on page"))?;

    let mut candidates = Vec::new();
    for item in list.select(&item_sel) {
        let Some(link) = item.select(&link_sel).next() else {
            continue;
        };
        let title = normalize_whitespace(&link.text().collect::<String>());
        if title.is_empty() {
            continue;
        }

        let href = resolve_url(base, link.value().attr("href").unwrap_or(""));
        let date = item
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_iso_date)
            .unwrap_or(today);

        candidates.push(CandidateEntry {
            title,
            category: category.to_string(),
            content: format!("Post from the official Python blog. Link: {href}"),
            date,
        });
    }

    log::debug!("{}: {} posts on listing", source_name, candidates.len());
    Ok(candidates)
}
