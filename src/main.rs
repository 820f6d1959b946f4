use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod category;
mod charset;
mod cli;
mod config;
mod dedup;
mod error;
mod extract;
mod feed;
mod http;
mod models;
mod pipeline;
mod scheduler;
mod sources;
mod store;
mod utils;

use cli::Cli;
use config::Settings;
use http::HttpFetcher;
use pipeline::Ingestor;
use scheduler::Scheduler;
use store::{JsonFileStore, MemoryStore, PersistenceGateway};
use utils::ensure_writable_parent;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("newswire_ingest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Settings: file first, then flags ----
    let mut settings = match &args.config {
        Some(path) => Settings::load(path).await?,
        None => Settings::default(),
    };
    if let Some(store) = &args.store {
        settings.store_path = store.clone();
    }
    if let Some(secs) = args.interval_secs {
        settings.interval_secs = secs;
    }
    settings.validate()?;

    // ---- Store: JSON-lines log, or memory only for --dry-run ----
    let memory = MemoryStore::seeded();
    let file_store = if args.dry_run {
        info!("Dry run: articles stay in memory and are discarded on exit");
        None
    } else {
        if let Err(e) = ensure_writable_parent(&settings.store_path).await {
            error!(
                path = %settings.store_path,
                error = %e,
                "Store directory is not writable (fix perms or choose a different path)"
            );
            return Err(e);
        }
        let store = Arc::new(JsonFileStore::open(&settings.store_path).await?);
        info!(
            store = %store.path().display(),
            articles = store.article_count().await,
            "Opened article store"
        );
        Some(store)
    };
    let gateway: Arc<dyn PersistenceGateway> = match &file_store {
        Some(store) => store.clone(),
        None => Arc::new(memory.clone()),
    };

    let http = Arc::new(HttpFetcher::new(&settings.http)?);
    let ingestor = Arc::new(Ingestor::new(
        &settings,
        sources::all().to_vec(),
        http,
        gateway,
    ));
    info!(sources = sources::all().len(), dry_run = args.dry_run, "Pipeline ready");

    if args.once {
        let scheduler = Scheduler::new(ingestor, Duration::from_secs(settings.interval_secs));
        scheduler.trigger().await;
    } else {
        let scheduler = Arc::new(Scheduler::new(
            ingestor,
            Duration::from_secs(settings.interval_secs),
        ));
        tokio::select! {
            _ = scheduler.run_forever() => {}
            res = tokio::signal::ctrl_c() => {
                res?;
                info!("Shutdown requested");
            }
        }
    }

    match &file_store {
        Some(store) => info!(articles = store.article_count().await, "Store totals"),
        None => {
            let state = memory.snapshot().await;
            info!(
                articles = state.articles.len(),
                links = state.associations.len(),
                "Dry run totals (nothing written)"
            );
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        "Execution time: {:.2?} ({}.{:03} seconds)",
        elapsed,
        elapsed.as_secs(),
        elapsed.subsec_millis()
    );

    Ok(())
}
