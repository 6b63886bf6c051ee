use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::queue::pool::DEFAULT_CONCURRENCY;

/// Settings for the claim worker process.
///
/// Loaded from a JSON file; everything except `spool_dir` has a default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Directory watched for claim admission tickets.
    pub spool_dir: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_languages")]
    pub ocr_languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub ocr_dpi: u32,
    /// Where fetched documents and page images are staged while a claim
    /// is processed.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Overrides the default database location under the home directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Buffered update events per subscriber before old ones are dropped.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_event_capacity() -> usize {
    100
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<WorkerSettings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<WorkerSettings, ConfigError> {
    let settings: WorkerSettings = serde_json::from_str(content)?;

    validate_settings(&settings)?;

    Ok(settings)
}

fn validate_settings(settings: &WorkerSettings) -> Result<(), ConfigError> {
    if settings.spool_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "spool_dir must not be empty".to_string(),
        });
    }

    if settings.concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "concurrency must be at least 1".to_string(),
        });
    }

    if !(72..=1200).contains(&settings.ocr_dpi) {
        return Err(ConfigError::Validation {
            message: format!("ocr_dpi must be between 72 and 1200, got {}", settings.ocr_dpi),
        });
    }

    if settings.ocr_languages.is_empty() || settings.ocr_languages.iter().any(|l| l.is_empty()) {
        return Err(ConfigError::Validation {
            message: "ocr_languages must name at least one language".to_string(),
        });
    }

    if settings.event_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "event_capacity must be at least 1".to_string(),
        });
    }

    Ok(())
}
