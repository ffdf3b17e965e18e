// src/presentation/session.rs

//! Live query session.
//!
//! A session task owns the query state. It recomputes the visible set when
//! the category changes, when debounced search text settles, or when a new
//! catalog is committed, and hands each result to the batch scheduler.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Catalog, PresentationConfig};
use crate::presentation::debounce::Debouncer;
use crate::presentation::scheduler::{BatchScheduler, ViewSubscriber};
use crate::query::{self, CategoryFilter, QueryState};

#[derive(Debug)]
enum QueryCommand {
    SetCategory(String),
    SetSearchText(String),
}

/// Input side of a running session.
#[derive(Debug, Clone)]
pub struct QueryHandle {
    commands: mpsc::UnboundedSender<QueryCommand>,
}

impl QueryHandle {
    /// Apply a category filter immediately.
    pub fn set_category(&self, category: impl Into<String>) -> Result<()> {
        self.send(QueryCommand::SetCategory(category.into()))
    }

    /// Queue raw search text; only the value that survives the debounce
    /// window is committed.
    pub fn set_search_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(QueryCommand::SetSearchText(text.into()))
    }

    fn send(&self, command: QueryCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::config("query session has stopped"))
    }
}

/// Session task state.
pub struct QuerySession {
    catalog: watch::Receiver<Arc<Catalog>>,
    catalog_open: bool,
    query: QueryState,
    debouncer: Debouncer<String>,
    scheduler: BatchScheduler,
    commands: mpsc::UnboundedReceiver<QueryCommand>,
}

impl QuerySession {
    /// Start a session over the catalog stream.
    ///
    /// The first view is delivered immediately. The task ends once every
    /// `QueryHandle` is dropped.
    pub fn spawn(
        catalog: watch::Receiver<Arc<Catalog>>,
        config: &PresentationConfig,
    ) -> (QueryHandle, ViewSubscriber, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let session = Self {
            catalog,
            catalog_open: true,
            query: QueryState::default(),
            debouncer: Debouncer::new(Duration::from_millis(config.debounce_ms)),
            scheduler: BatchScheduler::new(
                config.batch_size,
                Duration::from_millis(config.batch_interval_ms),
                event_tx,
            ),
            commands: command_rx,
        };

        let task = tokio::spawn(session.run());
        (
            QueryHandle {
                commands: command_tx,
            },
            ViewSubscriber::new(event_rx),
            task,
        )
    }

    async fn run(mut self) {
        self.render();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(QueryCommand::SetCategory(category)) => {
                        self.query.category = CategoryFilter::parse(&category);
                        self.render();
                    }
                    Some(QueryCommand::SetSearchText(text)) => self.debouncer.push(text),
                    None => break,
                },
                text = self.debouncer.fired() => {
                    self.query.search = text;
                    self.render();
                }
                changed = self.catalog.changed(), if self.catalog_open => {
                    if changed.is_ok() {
                        self.render();
                    } else {
                        log::debug!("Catalog publisher closed; serving last snapshot");
                        self.catalog_open = false;
                    }
                }
            }
        }
    }

    fn render(&mut self) {
        let catalog = Arc::clone(&self.catalog.borrow_and_update());
        let visible = query::apply(&catalog, &self.query);
        log::debug!(
            "Query [{}] '{}' matched {} of {} entries",
            self.query.category.label(),
            self.query.search,
            visible.len(),
            catalog.len()
        );
        self.scheduler.show(visible, self.query.clone());
    }
}
