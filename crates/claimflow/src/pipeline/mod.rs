pub mod context;
pub mod error;
pub mod runner;

pub use context::ClaimContext;
pub use error::PipelineError;
pub use runner::ClaimPipeline;
