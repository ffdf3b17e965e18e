//! refcat CLI
//!
//! Local entry point for syncing, browsing and editing the catalog.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use refcat::{
    error::{AppError, Result},
    models::{Config, EntryDraft},
    pipeline::CatalogService,
    presentation::{BatchScheduler, QuerySession, ViewEvent, ViewSubscriber},
    query::{self, QueryState},
    sources::build_sources,
    storage::{CatalogStore, LocalStorage},
    utils::http,
};
use tokio::io::{AsyncBufReadExt, BufReader};

const LIST_TEMPLATE: &str = "#{id}  {date}  [{category}] {title}";

/// refcat - personal reference catalog
#[derive(Parser, Debug)]
#[command(name = "refcat", version, about = "Personal reference catalog")]
struct Cli {
    /// Path to storage directory containing config.toml and the data file
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch all configured sources and merge new entries
    Sync,

    /// Print entries matching a category and search text
    List {
        #[arg(long, default_value = query::ALL_CATEGORIES)]
        category: String,

        #[arg(long, default_value = "")]
        search: String,
    },

    /// Print the category filter labels
    Categories,

    /// Print one entry in full
    Show { id: u64 },

    /// Create an entry
    Add {
        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        category: String,

        #[arg(long, default_value = "")]
        content: String,
    },

    /// Change an entry; omitted fields keep their value
    Edit {
        id: u64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        content: Option<String>,
    },

    /// Delete an entry
    Delete { id: u64 },

    /// Read search text from stdin, one line per change, and print live results
    Browse {
        #[arg(long, default_value = query::ALL_CATEGORIES)]
        category: String,
    },

    /// Validate configuration
    Validate,

    /// Show storage and catalog info
    Info,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_event(event: &ViewEvent) {
    match event {
        ViewEvent::Reset {
            query,
            total_entries,
            ..
        } => {
            println!(
                "-- [{}] '{}': {} entries",
                query.category.label(),
                query.search,
                total_entries
            );
        }
        ViewEvent::Batch(batch) => {
            for entry in &batch.entries {
                println!("{}", entry.format(LIST_TEMPLATE));
            }
        }
    }
}

/// Print one render session until its last batch.
async fn drain_view(subscriber: &mut ViewSubscriber) {
    let mut remaining = None;
    while remaining != Some(0) {
        let Some(event) = subscriber.next().await else {
            return;
        };
        print_event(&event);
        remaining = match event {
            ViewEvent::Reset { total_batches, .. } => Some(total_batches),
            ViewEvent::Batch(batch) => Some(batch.total - batch.index - 1),
        };
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.storage_dir.join("config.toml");
    let config = Config::load_or_default(&config_path);
    init_logging(cli.verbose, &config.logging.level);

    log::info!("Loaded configuration from {}", cli.storage_dir.display());

    let data_path = config.data_path(&cli.storage_dir);
    let store: Arc<dyn CatalogStore> = Arc::new(LocalStorage::new(&data_path));

    match cli.command {
        Command::Sync => {
            config.validate()?;
            let mut service = CatalogService::open(store).await;
            let client = http::create_async_client(&config.sync)?;
            let sources = build_sources(&config, &client);

            let report = service.sync(&sources, &config.sync).await?;
            for summary in &report.per_source {
                log::info!(
                    "  {}: {} candidates, {} added",
                    summary.name,
                    summary.candidates,
                    summary.added
                );
            }
            for failure in &report.failed_sources {
                log::warn!("  {} failed: {}", failure.name, failure.error);
            }
            log::info!(
                "Sync complete: {} added, {} duplicates, {} rejected",
                report.added,
                report.duplicates,
                report.rejected
            );

            if let Some(message) = report.save_error {
                return Err(AppError::StoreWrite {
                    path: data_path.display().to_string(),
                    message,
                });
            }
        }

        Command::List { category, search } => {
            let service = CatalogService::open(store).await;
            let query = QueryState::new(&category, search);
            let visible = query::apply(service.catalog(), &query);

            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let scheduler = BatchScheduler::new(
                config.presentation.batch_size,
                Duration::from_millis(config.presentation.batch_interval_ms),
                tx,
            );
            let mut subscriber = ViewSubscriber::new(rx);
            scheduler.show(visible, query);
            drain_view(&mut subscriber).await;
        }

        Command::Categories => {
            let service = CatalogService::open(store).await;
            for label in query::categories(service.catalog()) {
                println!("{label}");
            }
        }

        Command::Show { id } => {
            let service = CatalogService::open(store).await;
            let entry = service.get(id).ok_or(AppError::NotFound(id))?;
            println!("{}", entry.format("#{id} {title}\n[{category}] {date}\n\n{content}"));
        }

        Command::Add {
            title,
            category,
            content,
        } => {
            let mut service = CatalogService::open(store).await;
            let entry = service
                .create(EntryDraft::new(title, category, content))
                .await?;
            println!("Created #{} '{}'", entry.id, entry.title);
        }

        Command::Edit {
            id,
            title,
            category,
            content,
        } => {
            let mut service = CatalogService::open(store).await;
            let current = service.get(id).ok_or(AppError::NotFound(id))?;
            let draft = EntryDraft::new(
                title.unwrap_or_else(|| current.title.clone()),
                category.unwrap_or_else(|| current.category.clone()),
                content.unwrap_or_else(|| current.content.clone()),
            );
            let entry = service.edit(id, draft).await?;
            println!("Updated #{} '{}'", entry.id, entry.title);
        }

        Command::Delete { id } => {
            let mut service = CatalogService::open(store).await;
            let entry = service.delete(id).await?;
            println!("Deleted #{} '{}'", entry.id, entry.title);
        }

        Command::Browse { category } => {
            let service = CatalogService::open(store).await;
            let (handle, mut subscriber, session) =
                QuerySession::spawn(service.subscribe(), &config.presentation);
            handle.set_category(category)?;

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            let linger = Duration::from_millis(config.presentation.debounce_ms * 2);
            let mut stdin_open = true;
            loop {
                tokio::select! {
                    line = lines.next_line(), if stdin_open => match line? {
                        Some(text) => handle.set_search_text(text.trim())?,
                        None => stdin_open = false,
                    },
                    event = subscriber.next() => match event {
                        Some(event) => print_event(&event),
                        None => break,
                    },
                    _ = tokio::time::sleep(linger), if !stdin_open => break,
                }
            }

            drop(handle);
            if let Err(e) = session.await {
                log::warn!("Query session ended abnormally: {}", e);
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK ({} sources)", config.sources.len());

            match store.load().await {
                Ok(Some(entries)) => log::info!("✓ Data file OK ({} entries)", entries.len()),
                Ok(None) => log::info!("Data file not created yet"),
                Err(e) => {
                    log::error!("Data file check failed: {}", e);
                    return Err(e);
                }
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Data file: {}", data_path.display());

            match store.load().await {
                Ok(Some(entries)) => {
                    log::info!("Entries: {}", entries.len());
                    if let Some(latest) = entries.iter().map(|e| e.date).max() {
                        log::info!("Latest entry date: {}", latest);
                    }
                }
                Ok(None) => log::info!("No catalog found yet."),
                Err(e) => log::warn!("{}", e),
            }
            for source in &config.sources {
                log::info!("Source {}: {}", source.name(), source.url());
            }
        }
    }

    Ok(())
}
