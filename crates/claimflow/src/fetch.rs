//! Retrieval of source documents into local temp files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::FetchError;

/// Returns true when the reference must be fetched over HTTP rather
/// than copied from the local filesystem.
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Downloads or copies claim documents to pipeline-owned temp paths.
pub struct DocumentFetcher {
    client: reqwest::blocking::Client,
}

impl DocumentFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Materializes the referenced document at `dest`. The caller picks
    /// the destination and owns its cleanup, even when this fails
    /// partway through.
    pub fn fetch(&self, document_ref: &str, dest: &Path) -> Result<(), FetchError> {
        if is_remote(document_ref) {
            self.download(document_ref, dest)
        } else {
            fs::copy(Path::new(document_ref), dest)
                .map_err(|source| FetchError::CopyLocal {
                    path: PathBuf::from(document_ref),
                    source,
                })
                .map(|_| ())
        }
    }

    fn download(&self, reference: &str, dest: &Path) -> Result<(), FetchError> {
        let response = self
            .client
            .get(reference)
            .send()
            .map_err(|source| FetchError::Download {
                reference: reference.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                reference: reference.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().map_err(|source| FetchError::Download {
            reference: reference.to_string(),
            source,
        })?;
        fs::write(dest, &body).map_err(|source| FetchError::WriteTemp {
            path: dest.to_path_buf(),
            source,
        })
    }
}

impl Default for DocumentFetcher {
    fn default() -> Self {
        Self::new()
    }
}
