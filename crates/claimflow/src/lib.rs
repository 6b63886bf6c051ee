pub mod claim;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod notify;
pub mod ocr;
pub mod pipeline;
pub mod queue;
pub mod raster;

pub use claim::{Claim, ClaimFields, ClaimStatus};
pub use config::{load_config, WorkerSettings};
pub use db::Database;
pub use error::{ClaimflowError, ConfigError, FetchError, OcrError, QueueError, RasterError, Result};
pub use extract::FieldExtractor;
pub use notify::{ClaimUpdateEvent, UpdatePublisher};
pub use pipeline::{ClaimContext, ClaimPipeline, PipelineError};
pub use queue::{ClaimJob, ClaimQueue, ClaimTicket, JobOutcome, SpoolWatcher};
