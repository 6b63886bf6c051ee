use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::claim::Claim;
use crate::db::{claim_repo, Database};
use crate::error::QueueError;
use crate::pipeline::ClaimPipeline;
use crate::queue::job::{ClaimJob, JobOutcome};

/// Default number of worker threads pulling claims off the queue.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Bounded-concurrency claim queue. Admitted claims are persisted as
/// `queued`, handed to one of `worker_count` pipeline workers, and their
/// outcomes surface on the outcome channel.
pub struct ClaimQueue {
    db: Database,
    job_sender: Sender<ClaimJob>,
    outcome_receiver: Receiver<JobOutcome>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl ClaimQueue {
    /// Starts `worker_count` workers sharing one pipeline.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(db: Database, pipeline: Arc<ClaimPipeline>, worker_count: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = unbounded::<ClaimJob>();
        let (outcome_sender, outcome_receiver) = unbounded::<JobOutcome>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let outcome_tx = outcome_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_pipeline = Arc::clone(&pipeline);

            let handle = thread::spawn(move || {
                run_worker(worker_id, job_rx, outcome_tx, shutdown_flag, worker_pipeline);
            });

            workers.push(handle);
        }

        info!("Started {} claim workers", worker_count);

        Self {
            db,
            job_sender,
            outcome_receiver,
            workers,
            shutdown,
        }
    }

    /// Admits a claim into the queue.
    ///
    /// A claim id not seen before is persisted as `queued`; a known id is
    /// re-enqueued as-is, keeping whatever status and fields the earlier
    /// run stored until the new run overwrites them.
    pub fn admit(
        &self,
        claim_id: &str,
        owner_id: &str,
        document_ref: &str,
    ) -> crate::error::Result<ClaimJob> {
        let job = match claim_repo::find_by_id(&self.db, claim_id)? {
            Some(existing) => {
                debug!("Re-admitting known claim {}", claim_id);
                ClaimJob::for_claim(&existing)
            }
            None => {
                let claim = Claim::new(claim_id, owner_id, document_ref);
                claim_repo::insert(&self.db, &claim)?;
                info!("Claim {} queued for owner {}", claim_id, owner_id);
                ClaimJob::for_claim(&claim)
            }
        };

        self.submit(job.clone())?;
        Ok(job)
    }

    /// Enqueues an already-persisted job without touching the database.
    pub fn submit(&self, job: ClaimJob) -> Result<(), QueueError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(QueueError::ChannelClosed);
        }

        self.job_sender.send(job).map_err(|_| QueueError::ChannelClosed)
    }

    pub fn try_recv_outcome(&self) -> Option<JobOutcome> {
        self.outcome_receiver.try_recv().ok()
    }

    pub fn recv_outcome(&self) -> Option<JobOutcome> {
        self.outcome_receiver.recv().ok()
    }

    pub fn recv_outcome_timeout(&self, timeout: Duration) -> Option<JobOutcome> {
        self.outcome_receiver.recv_timeout(timeout).ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down claim queue...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All claim workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<ClaimJob>,
    outcome_sender: Sender<JobOutcome>,
    shutdown: Arc<AtomicBool>,
    pipeline: Arc<ClaimPipeline>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(job) => {
                debug!("Worker {} processing claim {}", worker_id, job.claim_id);

                let outcome = match pipeline.run(&job) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        error!(
                            "Worker {} could not record state for claim {}: {}",
                            worker_id, job.claim_id, e
                        );
                        JobOutcome::unrecorded(&job, e.to_string())
                    }
                };

                if let Err(e) = outcome_sender.send(outcome) {
                    error!("Worker {} failed to send outcome: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
