use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimflow::db::{self, claim_repo, Database};
use claimflow::error::ConfigError;
use claimflow::pipeline::ClaimPipeline;
use claimflow::queue::spool::admit_ticket;
use claimflow::queue::{ClaimQueue, SpoolWatcher};
use claimflow::{load_config, ClaimStatus, Result, UpdatePublisher, WorkerSettings};

fn main() {
    // Route log:: records from the storage modules through tracing
    tracing_log::LogTracer::init().expect("Failed to install log bridge");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run() {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    info!("Starting claimflow worker v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var("CLAIMFLOW_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("claimflow.json"));

    info!("Loading configuration from {}", config_path.display());
    let settings = load_config(&config_path)?;

    ensure_directories(&settings)?;

    let database_path = settings
        .database_path
        .clone()
        .or_else(db::default_database_path)
        .ok_or_else(|| ConfigError::Validation {
            message: "No database_path configured and no home directory found".to_string(),
        })?;
    let database = Database::open(&database_path)?;
    report_backlog(&database);

    let publisher = UpdatePublisher::new(database.clone(), settings.event_capacity);
    spawn_update_logger(&publisher);

    let pipeline = Arc::new(ClaimPipeline::from_settings(
        &settings,
        database.clone(),
        publisher,
    ));
    let queue = Arc::new(ClaimQueue::new(database, pipeline, settings.concurrency));

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        shutdown_flag.store(true, Ordering::Relaxed);
    })
    .expect("Failed to install Ctrl+C handler");

    let outcome_logger = spawn_outcome_logger(Arc::clone(&queue));

    // Pick up tickets that were spooled while the worker was down, then
    // stay on the directory until shutdown.
    let spool = SpoolWatcher::new(&settings.spool_dir);
    let admitted = spool.drain(&queue)?;
    if admitted > 0 {
        info!("Admitted {} spooled claims on startup", admitted);
    }

    let watch_queue = Arc::clone(&queue);
    spool.watch(
        move |path| {
            admit_ticket(&watch_queue, &path);
        },
        Arc::clone(&shutdown),
    )?;

    // Watch loop has returned; let in-flight claims finish.
    queue.shutdown();
    if let Err(e) = outcome_logger.join() {
        error!("Outcome logger panicked: {:?}", e);
    }

    match Arc::try_unwrap(queue) {
        Ok(queue) => queue.wait(),
        Err(_) => warn!("Queue still referenced at shutdown; skipping join"),
    }

    info!("Claim worker stopped");
    Ok(())
}

/// Reports claims a previous run left behind. A claim stuck in
/// processing means the worker died mid-run; it stays there until
/// resubmitted.
fn report_backlog(database: &Database) {
    for status in [ClaimStatus::Queued, ClaimStatus::Processing] {
        match claim_repo::count_by_status(database, status) {
            Ok(0) => {}
            Ok(n) => info!("{} claims still {} from earlier runs", n, status),
            Err(e) => warn!("Failed to count {} claims: {}", status, e),
        }
    }
}

fn ensure_directories(settings: &WorkerSettings) -> Result<()> {
    for dir in [&settings.spool_dir, &settings.temp_dir] {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Logs every published claim update until the publisher goes away.
fn spawn_update_logger(publisher: &UpdatePublisher) {
    let mut receiver = publisher.subscribe();
    thread::spawn(move || loop {
        match receiver.blocking_recv() {
            Ok(event) => info!(
                "Claim {} for owner {} now {}",
                event.claim.id, event.owner_id, event.claim.status
            ),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Skipped {} claim updates", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    });
}

/// Logs job outcomes until the workers drop their outcome senders.
fn spawn_outcome_logger(queue: Arc<ClaimQueue>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Some(outcome) = queue.recv_outcome() {
            match (outcome.success, outcome.status) {
                (true, _) => info!("Claim {} finished", outcome.claim_id),
                (false, Some(ClaimStatus::Failed)) => warn!(
                    "Claim {} failed: {}",
                    outcome.claim_id,
                    outcome.error.unwrap_or_default()
                ),
                (false, _) => error!(
                    "Claim {} left unrecorded: {}",
                    outcome.claim_id,
                    outcome.error.unwrap_or_default()
                ),
            }
        }
    })
}
