// src/presentation/scheduler.rs

//! Incremental batch delivery of a visible set.
//!
//! Every call to `BatchScheduler::show` advances a shared generation stamp
//! and starts a delivery task bound to the new stamp. A delivery task checks
//! its stamp before each batch and exits as soon as it is stale. The
//! subscriber side drops any batch whose stamp does not match the latest
//! reset it has seen, so a stale batch that raced the check never reaches
//! the consumer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::models::Entry;
use crate::query::{QueryState, VisibleSet};

/// Monotonic version stamp of the visible set.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Invalidate the current stamp and return the new one.
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, stamp: u64) -> bool {
        self.current() == stamp
    }
}

/// One slice of a visible set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub generation: u64,
    pub index: usize,
    pub total: usize,
    pub entries: Vec<Entry>,
}

impl Batch {
    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Message stream consumed by a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    /// Discard what is displayed; batches for `generation` follow.
    Reset {
        generation: u64,
        query: QueryState,
        total_entries: usize,
        total_batches: usize,
    },
    Batch(Batch),
}

/// Delivery state of a render session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Batching { generation: u64, next: usize },
}

/// Batch cursor over one visible set.
#[derive(Debug, Clone)]
pub struct RenderSession {
    visible: VisibleSet,
    batch_size: usize,
    state: RenderState,
}

impl RenderSession {
    pub fn new(batch_size: usize) -> Self {
        Self {
            visible: VisibleSet::default(),
            batch_size: batch_size.max(1),
            state: RenderState::Idle,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Number of batches for the current visible set.
    pub fn batch_count(&self) -> usize {
        self.visible.len().div_ceil(self.batch_size)
    }

    /// Drop any in-progress sequence and start again at batch 0.
    pub fn restart(&mut self, visible: VisibleSet, generation: u64) {
        self.visible = visible;
        self.state = if self.visible.is_empty() {
            RenderState::Idle
        } else {
            RenderState::Batching {
                generation,
                next: 0,
            }
        };
    }

    /// Produce the next batch, moving to `Idle` after the last one.
    pub fn tick(&mut self) -> Option<Batch> {
        let RenderState::Batching { generation, next } = self.state else {
            return None;
        };

        let total = self.batch_count();
        let start = next * self.batch_size;
        let end = (start + self.batch_size).min(self.visible.len());
        let batch = Batch {
            generation,
            index: next,
            total,
            entries: self.visible.entries()[start..end].to_vec(),
        };

        self.state = if next + 1 < total {
            RenderState::Batching {
                generation,
                next: next + 1,
            }
        } else {
            RenderState::Idle
        };
        Some(batch)
    }
}

/// Starts cooperative delivery tasks for successive visible sets.
#[derive(Debug)]
pub struct BatchScheduler {
    generation: Generation,
    batch_size: usize,
    interval: Duration,
    events: mpsc::UnboundedSender<ViewEvent>,
}

impl BatchScheduler {
    pub fn new(
        batch_size: usize,
        interval: Duration,
        events: mpsc::UnboundedSender<ViewEvent>,
    ) -> Self {
        Self {
            generation: Generation::new(),
            batch_size: batch_size.max(1),
            interval,
            events,
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Abandon any in-flight sequence and deliver `visible` from batch 0.
    ///
    /// Must be called from within a tokio runtime.
    pub fn show(&self, visible: VisibleSet, query: QueryState) -> u64 {
        let stamp = self.generation.advance();
        let mut session = RenderSession::new(self.batch_size);
        session.restart(visible, stamp);

        let reset = ViewEvent::Reset {
            generation: stamp,
            query,
            total_entries: session.visible.len(),
            total_batches: session.batch_count(),
        };
        if self.events.send(reset).is_err() {
            return stamp;
        }

        tokio::spawn(deliver(
            session,
            stamp,
            self.generation.clone(),
            self.events.clone(),
            self.interval,
        ));
        stamp
    }
}

async fn deliver(
    mut session: RenderSession,
    stamp: u64,
    generation: Generation,
    events: mpsc::UnboundedSender<ViewEvent>,
    interval: Duration,
) {
    loop {
        if !generation.is_current(stamp) {
            log::debug!("Render session {} cancelled", stamp);
            return;
        }

        let Some(batch) = session.tick() else {
            return;
        };
        if events.send(ViewEvent::Batch(batch)).is_err() {
            return;
        }
        if session.state() == RenderState::Idle {
            return;
        }

        if interval.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(interval).await;
        }
    }
}

/// Consumer end of a view stream.
#[derive(Debug)]
pub struct ViewSubscriber {
    events: mpsc::UnboundedReceiver<ViewEvent>,
    current: Option<u64>,
}

impl ViewSubscriber {
    pub fn new(events: mpsc::UnboundedReceiver<ViewEvent>) -> Self {
        Self {
            events,
            current: None,
        }
    }

    /// Next event for the latest render session; stale batches are skipped.
    pub async fn next(&mut self) -> Option<ViewEvent> {
        loop {
            let event = self.events.recv().await?;
            match &event {
                ViewEvent::Reset { generation, .. } => {
                    self.current = Some(*generation);
                    return Some(event);
                }
                ViewEvent::Batch(batch) if Some(batch.generation) == self.current => {
                    return Some(event);
                }
                ViewEvent::Batch(batch) => {
                    log::trace!("Dropping stale batch {} of {}", batch.index, batch.generation);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CandidateEntry;
    use chrono::NaiveDate;

    fn visible(n: u64) -> VisibleSet {
        (1..=n)
            .map(|id| {
                CandidateEntry {
                    title: format!("Entry {id}"),
                    category: "General".into(),
                    content: String::new(),
                    date: NaiveDate::from_ymd_opt(2026, 1, 19).unwrap(),
                }
                .into_entry(id)
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_generation_advances() {
        let generation = Generation::new();
        let first = generation.advance();
        let second = generation.advance();
        assert!(second > first);
        assert!(generation.is_current(second));
        assert!(!generation.is_current(first));
    }

    #[test]
    fn test_session_batches_cover_set_in_order() {
        let mut session = RenderSession::new(20);
        session.restart(visible(45), 1);
        assert_eq!(session.batch_count(), 3);

        let mut ids = Vec::new();
        let mut sizes = Vec::new();
        while let Some(batch) = session.tick() {
            sizes.push(batch.entries.len());
            ids.extend(batch.entries.iter().map(|e| e.id));
        }

        assert_eq!(sizes, vec![20, 20, 5]);
        assert_eq!(ids, (1..=45).collect::<Vec<_>>());
        assert_eq!(session.state(), RenderState::Idle);
    }

    #[test]
    fn test_session_restart_resets_counter() {
        let mut session = RenderSession::new(2);
        session.restart(visible(6), 1);
        session.tick();
        session.tick();

        session.restart(visible(3), 2);
        assert_eq!(
            session.state(),
            RenderState::Batching {
                generation: 2,
                next: 0
            }
        );
        let batch = session.tick().unwrap();
        assert_eq!(batch.index, 0);
        assert_eq!(batch.generation, 2);
    }

    #[test]
    fn test_empty_set_is_idle() {
        let mut session = RenderSession::new(20);
        session.restart(VisibleSet::default(), 1);
        assert_eq!(session.state(), RenderState::Idle);
        assert!(session.tick().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_delivers_everything() {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = BatchScheduler::new(20, Duration::from_millis(50), tx);
        let mut subscriber = ViewSubscriber::new(rx);

        scheduler.show(visible(45), QueryState::default());

        let Some(ViewEvent::Reset { total_batches, .. }) = subscriber.next().await else {
            panic!("expected reset");
        };
        assert_eq!(total_batches, 3);

        let mut ids = Vec::new();
        for _ in 0..total_batches {
            match subscriber.next().await {
                Some(ViewEvent::Batch(batch)) => ids.extend(batch.entries.iter().map(|e| e.id)),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(ids, (1..=45).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_set_cancels_in_flight_sequence() {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = BatchScheduler::new(10, Duration::from_millis(50), tx);
        let mut subscriber = ViewSubscriber::new(rx);

        let first = scheduler.show(visible(100), QueryState::default());
        assert!(matches!(subscriber.next().await, Some(ViewEvent::Reset { .. })));
        assert!(matches!(subscriber.next().await, Some(ViewEvent::Batch(_))));

        let second = scheduler.show(visible(15), QueryState::new("All", "x"));
        let mut seen_second_reset = false;
        let mut second_ids = Vec::new();
        while second_ids.len() < 15 {
            match subscriber.next().await.unwrap() {
                ViewEvent::Reset { generation, .. } => {
                    assert_eq!(generation, second);
                    seen_second_reset = true;
                }
                ViewEvent::Batch(batch) if batch.generation == first => {
                    assert!(!seen_second_reset, "stale batch after reset");
                }
                ViewEvent::Batch(batch) => {
                    assert_eq!(batch.generation, second);
                    second_ids.extend(batch.entries.iter().map(|e| e.id));
                }
            }
        }
        assert_eq!(second_ids, (1..=15).collect::<Vec<_>>());

        let quiet = tokio::time::timeout(Duration::from_secs(5), subscriber.next()).await;
        assert!(quiet.is_err(), "first sequence kept delivering");
    }

    #[tokio::test]
    async fn test_subscriber_filters_stale_batches() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscriber = ViewSubscriber::new(rx);
        let stale = Batch {
            generation: 1,
            index: 3,
            total: 5,
            entries: Vec::new(),
        };

        tx.send(ViewEvent::Reset {
            generation: 2,
            query: QueryState::default(),
            total_entries: 0,
            total_batches: 0,
        })
        .unwrap();
        tx.send(ViewEvent::Batch(stale)).unwrap();
        drop(tx);

        assert!(matches!(
            subscriber.next().await,
            Some(ViewEvent::Reset { generation: 2, .. })
        ));
        assert!(subscriber.next().await.is_none());
    }
}
