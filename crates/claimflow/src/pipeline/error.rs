use thiserror::Error;

/// Stage failures for a single claim run.
///
/// Download, conversion and recognition failures are terminal for the
/// claim but handled entirely inside the pipeline (recorded and
/// published). Only persistence failures propagate to the queue,
/// because a run that cannot record its state has not finished.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Download failed: {0}")]
    Download(#[from] crate::error::FetchError),

    #[error("Conversion failed: {0}")]
    Conversion(#[from] crate::error::RasterError),

    #[error("Recognition failed: {0}")]
    Recognition(#[from] crate::error::OcrError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] crate::db::DatabaseError),
}

impl PipelineError {
    /// Short stage name used in logs.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Download(_) => "download",
            PipelineError::Conversion(_) => "conversion",
            PipelineError::Recognition(_) => "recognition",
            PipelineError::Persistence(_) => "persistence",
        }
    }
}
