//! Test harness for isolated claim processing runs.
//!
//! `ClaimHarness` wires a real on-disk database, publisher, queue and
//! spool directory into one temporary tree. The external conversion and
//! recognition stages are replaced with plain-file stand-ins, so a test
//! "document" is just a text file whose content reaches the extractor
//! verbatim.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use claimflow::db::Database;
use claimflow::error::{OcrError, RasterError};
use claimflow::notify::UpdatePublisher;
use claimflow::ocr::TextRecognizer;
use claimflow::pipeline::ClaimPipeline;
use claimflow::queue::{ClaimQueue, ClaimTicket, SpoolWatcher};
use claimflow::raster::PageRasterizer;

/// Stands in for pdftoppm by copying the document file as the page image.
pub struct CopyRasterizer;

impl PageRasterizer for CopyRasterizer {
    fn rasterize_first_page(
        &self,
        pdf_path: &Path,
        output_prefix: &Path,
    ) -> Result<PathBuf, RasterError> {
        let output = PathBuf::from(format!("{}-1.png", output_prefix.display()));
        fs::copy(pdf_path, &output).map_err(|source| RasterError::ReadDocument {
            path: pdf_path.to_path_buf(),
            source,
        })?;
        Ok(output)
    }
}

/// Stands in for tesseract by reading the page "image" back as UTF-8 text.
pub struct PlainTextRecognizer;

impl TextRecognizer for PlainTextRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        fs::read_to_string(image_path).map_err(|source| OcrError::ReadImage {
            path: image_path.to_path_buf(),
            source,
        })
    }
}

/// Isolated environment for exercising the full claim queue.
pub struct ClaimHarness {
    base: TempDir,
    pub db: Database,
    pub publisher: UpdatePublisher,
    /// Directory watched for admission tickets.
    pub spool_dir: PathBuf,
    /// Staging directory for fetched documents and page images.
    pub work_dir: PathBuf,
    /// Where test documents live; tickets reference them by path.
    pub docs_dir: PathBuf,
}

impl ClaimHarness {
    pub fn new() -> Self {
        let base = TempDir::new().expect("Failed to create temp directory");
        let spool_dir = base.path().join("spool");
        let work_dir = base.path().join("work");
        let docs_dir = base.path().join("docs");

        fs::create_dir_all(&spool_dir).expect("Failed to create spool dir");
        fs::create_dir_all(&work_dir).expect("Failed to create work dir");
        fs::create_dir_all(&docs_dir).expect("Failed to create docs dir");

        let db = Database::open(base.path().join("data").join("claims.db"))
            .expect("Failed to open database");
        let publisher = UpdatePublisher::new(db.clone(), 64);

        Self {
            base,
            db,
            publisher,
            spool_dir,
            work_dir,
            docs_dir,
        }
    }

    /// Starts a queue whose pipeline uses the plain-file stage stand-ins.
    pub fn start_queue(&self, worker_count: usize) -> ClaimQueue {
        let pipeline = Arc::new(ClaimPipeline::with_stages(
            self.db.clone(),
            self.publisher.clone(),
            Box::new(CopyRasterizer),
            Box::new(PlainTextRecognizer),
            self.work_dir.clone(),
        ));
        ClaimQueue::new(self.db.clone(), pipeline, worker_count)
    }

    /// Writes a claim document and returns its path for use as a
    /// document reference.
    pub fn write_document(&self, name: &str, text: &str) -> PathBuf {
        let path = self.docs_dir.join(name);
        fs::write(&path, text).expect("Failed to write document");
        path
    }

    /// Drops an admission ticket into the spool directory.
    pub fn write_ticket(&self, name: &str, ticket: &ClaimTicket) -> PathBuf {
        let path = self.spool_dir.join(name);
        let json = serde_json::to_string_pretty(ticket).expect("Failed to serialize ticket");
        fs::write(&path, json).expect("Failed to write ticket");
        path
    }

    pub fn spool_watcher(&self) -> SpoolWatcher {
        SpoolWatcher::new(&self.spool_dir)
    }

    /// Files currently staged in the pipeline work directory. Zero after
    /// every run, whatever the outcome.
    pub fn staged_file_count(&self) -> usize {
        fs::read_dir(&self.work_dir)
            .expect("Failed to read work dir")
            .count()
    }
}

impl Default for ClaimHarness {
    fn default() -> Self {
        Self::new()
    }
}
