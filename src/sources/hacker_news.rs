//! Hacker News front page source.
//!
//! Shallow mode reads the front page only. Deep mode also visits every
//! story, one request at a time with `request_delay` between them, and uses
//! the opening paragraphs as content. A story whose article fails or runs
//! past `article_timeout` keeps its shallow content. Once the source's time
//! budget is nearly spent the remaining stories are not visited at all.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use scraper::Html;
use tokio::time::Instant;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CandidateEntry, FetchMode};
use crate::sources::{SourceAdapter, parse_selector};
use crate::utils::http::fetch_text;
use crate::utils::{normalize_whitespace, resolve_url, truncate_chars};

/// A story link found on the front page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryLink {
    pub title: String,
    pub href: String,
}

/// Scrapes the Hacker News front page.
pub struct HackerNewsSource {
    name: String,
    url: String,
    category: String,
    limit: usize,
    fetch_mode: FetchMode,
    request_delay: Duration,
    article_timeout: Duration,
    time_budget: Option<Duration>,
    excerpt_chars: usize,
    client: reqwest::Client,
}

/// Slack left before the budget runs out, at most a quarter of it.
const BUDGET_MARGIN: Duration = Duration::from_millis(500);

impl HackerNewsSource {
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
            limit: 15,
            fetch_mode: FetchMode::Shallow,
            request_delay: Duration::ZERO,
            article_timeout: Duration::from_secs(5),
            time_budget: None,
            excerpt_chars: 400,
            client,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_fetch_mode(mut self, fetch_mode: FetchMode, request_delay: Duration) -> Self {
        self.fetch_mode = fetch_mode;
        self.request_delay = request_delay;
        self
    }

    pub fn with_article_timeout(mut self, article_timeout: Duration) -> Self {
        self.article_timeout = article_timeout;
        self
    }

    /// Total time the whole fetch may take; deep mode stops visiting
    /// articles early enough to return inside it.
    pub fn with_time_budget(mut self, time_budget: Duration) -> Self {
        self.time_budget = Some(time_budget);
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    fn shallow_content(href: &str) -> String {
        format!("Popular topic from Hacker News. Link: {href}")
    }

    async fn fetch_excerpt(&self, href: &str) -> Result<String> {
        let html = fetch_text(&self.client, href).await?;
        parse_article_excerpt(&html, self.excerpt_chars)?
            .ok_or_else(|| AppError::source_shape(&self.name, format!("no text at {href}")))
    }

    /// Point after which no article request is started.
    fn deadline(&self, started: Instant) -> Option<Instant> {
        let budget = self.time_budget?;
        started.checked_add(budget.saturating_sub(BUDGET_MARGIN.min(budget / 4)))
    }

    /// Content for one story in deep mode; `None` once the budget is spent.
    async fn deep_content(
        &self,
        idx: usize,
        href: &str,
        deadline: Option<Instant>,
    ) -> Option<String> {
        let pause = if idx > 0 {
            self.request_delay
        } else {
            Duration::ZERO
        };
        if time_left(deadline) <= pause {
            return None;
        }
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }

        let bound = self.article_timeout.min(time_left(deadline));
        if bound.is_zero() {
            return None;
        }

        let content = match tokio::time::timeout(bound, self.fetch_excerpt(href)).await {
            Ok(Ok(excerpt)) => format!("{excerpt}\n\nLink: {href}"),
            Ok(Err(e)) => {
                log::debug!("{}: keeping shallow content for {}: {}", self.name, href, e);
                Self::shallow_content(href)
            }
            Err(_) => {
                log::debug!(
                    "{}: article {} timed out after {:?}",
                    self.name,
                    href,
                    bound
                );
                Self::shallow_content(href)
            }
        };
        Some(content)
    }
}

fn time_left(deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => deadline.saturating_duration_since(Instant::now()),
        None => Duration::MAX,
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<CandidateEntry>> {
        let deadline = self.deadline(Instant::now());
        let base = Url::parse(&self.url)?;
        let html = fetch_text(&self.client, &self.url).await?;
        let stories = parse_front_page(&self.name, &html, &base, self.limit)?;
        let today = Local::now().date_naive();

        let mut budget_spent = false;
        let mut candidates = Vec::with_capacity(stories.len());
        for (idx, story) in stories.into_iter().enumerate() {
            let content = match self.fetch_mode {
                FetchMode::Deep if !budget_spent => {
                    match self.deep_content(idx, &story.href, deadline).await {
                        Some(content) => content,
                        None => {
                            log::info!(
                                "{}: time budget spent, remaining stories keep shallow content",
                                self.name
                            );
                            budget_spent = true;
                            Self::shallow_content(&story.href)
                        }
                    }
                }
                _ => Self::shallow_content(&story.href),
            };

            candidates.push(story_candidate(story, &self.category, content, today));
        }
        Ok(candidates)
    }
}

fn story_candidate(
    story: StoryLink,
    category: &str,
    content: String,
    date: NaiveDate,
) -> CandidateEntry {
    CandidateEntry {
        title: story.title,
        category: category.to_string(),
        content,
        date,
    }
}

/// Extract up to `limit` story links from the front page.
pub fn parse_front_page(
    source_name: &str,
    html: &str,
    base: &Url,
    limit: usize,
) -> Result<Vec<StoryLink>> {
    let document = Html::parse_document(html);
    let title_sel = parse_selector("span.titleline")?;
    let link_sel = parse_selector("a")?;

    let lines: Vec<_> = document.select(&title_sel).collect();
    if lines.is_empty() {
        return Err(AppError::source_shape(source_name, "no story titles on page"));
    }

    let stories = lines
        .into_iter()
        .filter_map(|line| {
            let link = line.select(&link_sel).next()?;
            let title = normalize_whitespace(&link.text().collect::<String>());
            if title.is_empty() {
                return None;
            }
            let href = resolve_url(base, link.value().attr("href").unwrap_or(""));
            Some(StoryLink { title, href })
        })
        .take(limit)
        .collect();
    Ok(stories)
}

/// Opening paragraph text of an article, truncated to `max_chars`.
pub fn parse_article_excerpt(html: &str, max_chars: usize) -> Result<Option<String>> {
    let document = Html::parse_document(html);
    let para_sel = parse_selector("p")?;

    let mut excerpt = String::new();
    for para in document.select(&para_sel) {
        let text = normalize_whitespace(&para.text().collect::<String>());
        if text.is_empty() {
            continue;
        }
        if !excerpt.is_empty() {
            excerpt.push(' ');
        }
        excerpt.push_str(&text);
        if excerpt.chars().count() >= max_chars {
            break;
        }
    }

    if excerpt.is_empty() {
        Ok(None)
    } else {
        Ok(Some(truncate_chars(&excerpt, max_chars)))
    }
}
