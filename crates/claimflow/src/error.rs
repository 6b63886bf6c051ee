use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClaimflowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Rasterization error: {0}")]
    Raster(#[from] RasterError),

    #[error("Recognition error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

/// Failures while retrieving the source document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to download '{reference}': {source}")]
    Download {
        reference: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned {status} for '{reference}'")]
    HttpStatus { reference: String, status: u16 },

    #[error("Failed to copy local document '{path}': {source}")]
    CopyLocal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write temp document '{path}': {source}")]
    WriteTemp {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures while converting the document's first page to an image.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("Failed to read document '{path}': {source}")]
    ReadDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Document '{path}' is not a readable PDF: {reason}")]
    InvalidPdf { path: PathBuf, reason: String },

    #[error("Document '{path}' is encrypted")]
    Encrypted { path: PathBuf },

    #[error("Failed to rasterize page: {0}")]
    RasterizeFailed(String),

    #[error("Renderer produced no output image for '{path}'")]
    MissingOutput { path: PathBuf },
}

/// Failures while running character recognition on the page image.
#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to read image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialize OCR engine: {0}")]
    EngineInit(String),

    #[error("Recognition failed: {0}")]
    Recognition(String),
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Job channel closed unexpectedly")]
    ChannelClosed,

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Watch error: {0}")]
    WatchError(String),
}

pub type Result<T> = std::result::Result<T, ClaimflowError>;
