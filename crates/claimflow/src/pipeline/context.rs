use std::path::PathBuf;

use crate::claim::ClaimFields;
use crate::queue::job::ClaimJob;

/// Mutable state threaded through one claim run.
///
/// Temp paths are recorded the moment they are decided, before the
/// producing stage runs, so `cleanup` covers partial output on every
/// exit path.
pub struct ClaimContext {
    // Input
    pub job: ClaimJob,

    // Fetch stage: temp copy of the source document
    pub document_path: Option<PathBuf>,

    // Rasterize stage: rendered first-page image
    pub image_path: Option<PathBuf>,

    // Recognize stage result, guaranteed Some after step_recognize
    pub text: Option<String>,

    // Extract stage result, guaranteed Some after step_extract
    pub fields: Option<ClaimFields>,
}

impl ClaimContext {
    pub fn new(job: ClaimJob) -> Self {
        Self {
            job,
            document_path: None,
            image_path: None,
            text: None,
            fields: None,
        }
    }

    /// Removes every temp file this run produced. A file that was never
    /// written (or already removed) is fine; other removal errors are
    /// logged and otherwise ignored.
    pub fn cleanup(&mut self) {
        for path in [self.document_path.take(), self.image_path.take()]
            .into_iter()
            .flatten()
        {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    log::warn!("Failed to remove temp file {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_job() -> ClaimJob {
        ClaimJob::new("claim-1", "owner-1", "/tmp/doc.pdf")
    }

    #[test]
    fn test_cleanup_removes_registered_files() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("claim-1.pdf");
        let image = dir.path().join("claim-1-1.png");
        std::fs::write(&doc, b"pdf").unwrap();
        std::fs::write(&image, b"png").unwrap();

        let mut ctx = ClaimContext::new(test_job());
        ctx.document_path = Some(doc.clone());
        ctx.image_path = Some(image.clone());
        ctx.cleanup();

        assert!(!doc.exists());
        assert!(!image.exists());
    }

    #[test]
    fn test_cleanup_tolerates_missing_files() {
        let dir = TempDir::new().unwrap();
        let mut ctx = ClaimContext::new(test_job());
        ctx.document_path = Some(dir.path().join("never-written.pdf"));
        ctx.cleanup();
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("claim-2.pdf");
        std::fs::write(&doc, b"pdf").unwrap();

        let mut ctx = ClaimContext::new(test_job());
        ctx.document_path = Some(doc.clone());
        ctx.cleanup();
        ctx.cleanup();

        assert!(!doc.exists());
    }
}
