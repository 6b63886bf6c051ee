pub mod job;
pub mod pool;
pub mod spool;

pub use job::{ClaimJob, JobOutcome};
pub use pool::{ClaimQueue, DEFAULT_CONCURRENCY};
pub use spool::{ClaimTicket, SpoolWatcher};
