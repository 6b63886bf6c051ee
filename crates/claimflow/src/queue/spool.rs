use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use notify::{Config as NotifyConfig, PollWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer_opt, Config as DebouncerConfig, DebouncedEventKind};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::QueueError;
use crate::queue::pool::ClaimQueue;

/// File extension for admission tickets in the spool directory.
pub const TICKET_EXTENSION: &str = "json";

/// On-disk admission ticket. Dropping one of these into the spool
/// directory asks the worker to enqueue the referenced claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimTicket {
    pub claim_id: String,
    pub owner_id: String,
    pub document_ref: String,
}

impl ClaimTicket {
    fn is_complete(&self) -> bool {
        !self.claim_id.is_empty() && !self.owner_id.is_empty() && !self.document_ref.is_empty()
    }
}

/// Parses and admits one ticket file, consuming it on success.
///
/// Unreadable or malformed tickets are renamed with a `.rejected` suffix
/// so they stop matching future scans. Tickets the queue refuses (for
/// example during shutdown) are left in place for the next scan.
pub fn admit_ticket(queue: &ClaimQueue, path: &Path) -> bool {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Failed to read ticket {}: {}", path.display(), e);
            return false;
        }
    };

    let ticket: ClaimTicket = match serde_json::from_str(&raw) {
        Ok(ticket) => ticket,
        Err(e) => {
            warn!("Rejecting malformed ticket {}: {}", path.display(), e);
            reject_ticket(path);
            return false;
        }
    };

    if !ticket.is_complete() {
        warn!("Rejecting incomplete ticket {}", path.display());
        reject_ticket(path);
        return false;
    }

    match queue.admit(&ticket.claim_id, &ticket.owner_id, &ticket.document_ref) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to remove consumed ticket {}: {}", path.display(), e);
            }
            true
        }
        Err(e) => {
            error!("Failed to admit ticket {}: {}", path.display(), e);
            false
        }
    }
}

fn reject_ticket(path: &Path) {
    let mut rejected = path.as_os_str().to_os_string();
    rejected.push(".rejected");
    if let Err(e) = fs::rename(path, &rejected) {
        warn!("Failed to set aside ticket {}: {}", path.display(), e);
    }
}

pub struct SpoolWatcher {
    spool_dir: PathBuf,
}

impl SpoolWatcher {
    pub fn new<P: AsRef<Path>>(spool_dir: P) -> Self {
        Self {
            spool_dir: spool_dir.as_ref().to_path_buf(),
        }
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Lists ticket files currently sitting in the spool directory.
    pub fn scan(&self) -> Result<Vec<PathBuf>, QueueError> {
        let mut tickets = Vec::new();

        for entry in WalkDir::new(&self.spool_dir)
            .min_depth(1)
            .max_depth(1) // Only scan top level, not subdirectories
            .into_iter()
        {
            let entry = entry.map_err(|source| QueueError::ScanFailed {
                path: self.spool_dir.clone(),
                source,
            })?;
            let path = entry.path();

            if path.is_dir() {
                continue;
            }

            if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                if ext.eq_ignore_ascii_case(TICKET_EXTENSION) {
                    debug!("Found ticket: {}", path.display());
                    tickets.push(path.to_path_buf());
                }
            }
        }

        info!(
            "Scanned {} tickets in {}",
            tickets.len(),
            self.spool_dir.display()
        );
        Ok(tickets)
    }

    /// Admits every ticket currently spooled. Returns how many were
    /// accepted into the queue.
    pub fn drain(&self, queue: &ClaimQueue) -> Result<usize, QueueError> {
        let mut admitted = 0;
        for path in self.scan()? {
            if admit_ticket(queue, &path) {
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    pub fn watch<F>(&self, callback: F, shutdown: Arc<AtomicBool>) -> Result<(), QueueError>
    where
        F: Fn(PathBuf) + Send + 'static,
    {
        let spool_dir = self.spool_dir.clone();

        // Use PollWatcher for Docker/NFS compatibility
        let poll_config = NotifyConfig::default().with_poll_interval(Duration::from_secs(2));

        let debouncer_config = DebouncerConfig::default()
            .with_timeout(Duration::from_millis(500))
            .with_notify_config(poll_config);

        let (tx, rx) = std::sync::mpsc::channel();

        let mut debouncer = new_debouncer_opt::<_, PollWatcher>(debouncer_config, tx)
            .map_err(|e| QueueError::WatchError(e.to_string()))?;

        debouncer
            .watcher()
            .watch(&spool_dir, RecursiveMode::NonRecursive)
            .map_err(|e| QueueError::WatchError(e.to_string()))?;

        info!("Watching spool directory: {}", spool_dir.display());

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!("Spool watch shutting down...");
                break;
            }

            match rx.recv_timeout(Duration::from_millis(100)) {
                Ok(Ok(events)) => {
                    for event in events {
                        if matches!(event.kind, DebouncedEventKind::Any) {
                            let path = &event.path;

                            if path.is_dir() {
                                continue;
                            }

                            // Rejected and consumed tickets fire events too;
                            // only still-present ticket files count.
                            if path.exists() {
                                if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
                                    if ext.eq_ignore_ascii_case(TICKET_EXTENSION) {
                                        info!("New ticket detected: {}", path.display());
                                        callback(path.to_path_buf());
                                    }
                                }
                            }
                        }
                    }
                }
                Ok(Err(errors)) => {
                    warn!("Watch error: {:?}", errors);
                }
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    continue;
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watch channel disconnected");
                    break;
                }
            }
        }

        Ok(())
    }
}
