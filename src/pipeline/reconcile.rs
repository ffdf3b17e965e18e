// src/pipeline/reconcile.rs

//! Reconciliation of remote candidates into the catalog.
//!
//! Sources are fetched concurrently (bounded, order-preserving) and each
//! failure is isolated to its source. The merge itself is a single pass:
//! the duplicate key set and the id counter are built once and updated as
//! candidates are accepted.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{CandidateEntry, Catalog, normalize_title};
use crate::sources::SourceAdapter;

/// Candidates fetched from one source, or the reason it produced none.
#[derive(Debug)]
pub struct SourceBatch {
    pub name: String,
    pub result: Result<Vec<CandidateEntry>>,
}

impl SourceBatch {
    pub fn ok(name: impl Into<String>, candidates: Vec<CandidateEntry>) -> Self {
        Self {
            name: name.into(),
            result: Ok(candidates),
        }
    }

    pub fn failed(name: impl Into<String>, error: AppError) -> Self {
        Self {
            name: name.into(),
            result: Err(error),
        }
    }
}

/// Per-source counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub name: String,
    pub candidates: usize,
    pub added: usize,
}

/// A source that contributed nothing because it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFailure {
    pub name: String,
    pub error: String,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Entries appended to the catalog
    pub added: usize,
    /// Candidates discarded because their title is already known
    pub duplicates: usize,
    /// Candidates discarded because their title is blank
    pub rejected: usize,
    /// Sources that produced candidates, in merge order
    pub per_source: Vec<SourceSummary>,
    /// Sources that failed, in merge order
    pub failed_sources: Vec<SourceFailure>,
    /// Set when the merged catalog could not be persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<String>,
}

impl ReconcileReport {
    pub fn failure_count(&self) -> usize {
        self.failed_sources.len()
    }

    /// Whether the merged catalog reached the store.
    pub fn is_saved(&self) -> bool {
        self.save_error.is_none()
    }
}

/// Merges candidate batches into a catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Self
    }

    /// Merge batches in order and return the new catalog with its report.
    ///
    /// A candidate is accepted iff its normalized title is neither in the
    /// starting catalog nor accepted earlier in the same run.
    pub fn merge(
        &self,
        catalog: &Catalog,
        batches: Vec<SourceBatch>,
    ) -> (Catalog, ReconcileReport) {
        let mut merged = catalog.clone();
        let mut known = catalog.title_keys();
        let mut report = ReconcileReport::default();

        for batch in batches {
            let candidates = match batch.result {
                Ok(candidates) => candidates,
                Err(error) => {
                    log::warn!("Source '{}' contributed nothing: {}", batch.name, error);
                    report.failed_sources.push(SourceFailure {
                        name: batch.name,
                        error: error.to_string(),
                    });
                    continue;
                }
            };

            let mut summary = SourceSummary {
                name: batch.name,
                candidates: candidates.len(),
                added: 0,
            };

            for mut candidate in candidates {
                let title = candidate.title.trim();
                if title.is_empty() {
                    report.rejected += 1;
                    continue;
                }

                if !known.insert(normalize_title(title)) {
                    log::debug!("{}: skipping duplicate '{}'", summary.name, title);
                    report.duplicates += 1;
                    continue;
                }

                candidate.title = title.to_string();
                match merged.push_candidate(candidate) {
                    Ok(id) => {
                        log::debug!("{}: added entry {}", summary.name, id);
                        summary.added += 1;
                        report.added += 1;
                    }
                    Err(e) => {
                        log::warn!("{}: cannot add candidate: {}", summary.name, e);
                        report.rejected += 1;
                    }
                }
            }

            report.per_source.push(summary);
        }

        (merged, report)
    }
}

/// Fetch every source concurrently, keeping results in source order.
///
/// A source that errors or exceeds `timeout` yields a failed batch; it never
/// cancels its siblings.
pub async fn fetch_all(
    sources: &[Box<dyn SourceAdapter>],
    timeout: Duration,
    max_concurrent: usize,
) -> Vec<SourceBatch> {
    stream::iter(sources)
        .map(|source| async move {
            let name = source.name().to_string();
            log::info!("Fetching source '{}'", name);

            match tokio::time::timeout(timeout, source.fetch()).await {
                Ok(Ok(candidates)) => {
                    log::info!("Source '{}' returned {} candidates", name, candidates.len());
                    SourceBatch::ok(name, candidates)
                }
                Ok(Err(error)) => {
                    let error = error.for_source(&name);
                    log::warn!("{}", error);
                    SourceBatch::failed(name, error)
                }
                Err(_) => {
                    log::warn!("Source '{}' timed out after {:?}", name, timeout);
                    let error =
                        AppError::source_fetch(&name, format!("timed out after {timeout:?}"));
                    SourceBatch::failed(name, error)
                }
            }
        })
        .buffered(max_concurrent.max(1))
        .collect()
        .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::Entry;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    pub(crate) fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()
    }

    pub(crate) fn candidate(title: &str, category: &str) -> CandidateEntry {
        CandidateEntry {
            title: title.to_string(),
            category: category.to_string(),
            content: format!("About {title}"),
            date: date(),
        }
    }

    fn entry(id: u64, title: &str, category: &str) -> Entry {
        candidate(title, category).into_entry(id)
    }

    pub(crate) fn seed() -> Catalog {
        Catalog::from_entries(vec![entry(1, "Python", "Prog"), entry(2, "JSON", "Data")])
    }

    /// Source with canned behavior for fan-out tests.
    pub(crate) enum FakeSource {
        Ok(&'static str, Vec<CandidateEntry>),
        Fail(&'static str),
        Hang(&'static str),
        BadUrl(&'static str),
    }

    #[async_trait]
    impl SourceAdapter for FakeSource {
        fn name(&self) -> &str {
            match self {
                Self::Ok(name, _) | Self::Fail(name) | Self::Hang(name) | Self::BadUrl(name) => {
                    name
                }
            }
        }

        async fn fetch(&self) -> Result<Vec<CandidateEntry>> {
            match self {
                Self::Ok(_, candidates) => Ok(candidates.clone()),
                Self::Fail(name) => Err(AppError::source_fetch(*name, "connection refused")),
                Self::Hang(_) => {
                    std::future::pending::<()>().await;
                    Ok(Vec::new())
                }
                Self::BadUrl(_) => {
                    url::Url::parse("not a url")?;
                    Ok(Vec::new())
                }
            }
        }
    }

    #[test]
    fn test_merge_scenario() {
        let batches = vec![SourceBatch::ok(
            "snapshot",
            vec![candidate("Python", "Other"), candidate("Go", "Prog")],
        )];

        let (merged, report) = Reconciler::new().merge(&seed(), batches);

        assert_eq!(report.added, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(merged.len(), 3);
        let go = merged.entries().last().unwrap();
        assert_eq!(go.id, 3);
        assert_eq!(go.title, "Go");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let make = || {
            vec![
                SourceBatch::ok("a", vec![candidate("Go", "Prog"), candidate("Rust", "Prog")]),
                SourceBatch::ok("b", vec![candidate("TOML", "Data")]),
            ]
        };
        let reconciler = Reconciler::new();

        let (once, first) = reconciler.merge(&seed(), make());
        let (twice, second) = reconciler.merge(&once, make());

        assert_eq!(first.added, 3);
        assert_eq!(second.added, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_ids_are_fresh_and_distinct() {
        let start = seed();
        let batches = vec![SourceBatch::ok(
            "a",
            (0..10).map(|i| candidate(&format!("Topic {i}"), "X")).collect(),
        )];

        let (merged, _) = Reconciler::new().merge(&start, batches);
        let new_ids: Vec<u64> = merged.entries()[start.len()..].iter().map(|e| e.id).collect();

        assert!(new_ids.iter().all(|id| *id > start.max_id()));
        let mut deduped = new_ids.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), new_ids.len());
        assert!(new_ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_duplicate_key_is_normalized_and_updated_within_run() {
        let batches = vec![
            SourceBatch::ok("a", vec![candidate("  PYTHON ", "X"), candidate("Go", "Prog")]),
            SourceBatch::ok("b", vec![candidate("go", "Other"), candidate("   ", "X")]),
        ];

        let (merged, report) = Reconciler::new().merge(&seed(), batches);

        assert_eq!(report.added, 1);
        assert_eq!(report.duplicates, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(merged.get(3).unwrap().category, "Prog");
        assert_eq!(report.per_source[1].added, 0);
    }

    #[test]
    fn test_failed_source_is_isolated() {
        let batches = vec![
            SourceBatch::failed("broken", AppError::source_shape("broken", "object")),
            SourceBatch::ok("working", vec![candidate("Go", "Prog")]),
        ];

        let (merged, report) = Reconciler::new().merge(&seed(), batches);

        assert_eq!(report.added, 1);
        assert_eq!(report.failure_count(), 1);
        assert_eq!(report.failed_sources[0].name, "broken");
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_exhausted_ids_reject_candidates() {
        let start = Catalog::from_entries(vec![entry(u64::MAX, "Last", "X")]);
        let batches = vec![SourceBatch::ok("a", vec![candidate("Go", "Prog")])];

        let (merged, report) = Reconciler::new().merge(&start, batches);

        assert_eq!(report.added, 0);
        assert_eq!(report.rejected, 1);
        assert_eq!(merged, start);
    }

    #[test]
    fn test_source_order_decides_ids() {
        let batches = vec![
            SourceBatch::ok("first", vec![candidate("B", "X")]),
            SourceBatch::ok("second", vec![candidate("A", "X")]),
        ];

        let (merged, _) = Reconciler::new().merge(&Catalog::new(), batches);

        assert_eq!(merged.get(1).unwrap().title, "B");
        assert_eq!(merged.get(2).unwrap().title, "A");
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_isolates_failures_and_timeouts() {
        let sources: Vec<Box<dyn SourceAdapter>> = vec![
            Box::new(FakeSource::Hang("slow")),
            Box::new(FakeSource::Fail("down")),
            Box::new(FakeSource::Ok("up", vec![candidate("Go", "Prog")])),
            Box::new(FakeSource::BadUrl("typo")),
        ];

        let batches = fetch_all(&sources, Duration::from_secs(5), 4).await;

        let names: Vec<&str> = batches.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["slow", "down", "up", "typo"]);
        assert!(matches!(batches[0].result, Err(AppError::SourceFetch { .. })));
        assert!(batches[1].result.is_err());
        assert_eq!(batches[2].result.as_ref().unwrap().len(), 1);
        assert!(matches!(
            &batches[3].result,
            Err(AppError::SourceFetch { source_name, .. }) if source_name == "typo"
        ));
    }
}
