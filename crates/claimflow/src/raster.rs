//! First-page rasterization of claim PDFs via poppler's pdftoppm.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::RasterError;

/// Converts the first page of a PDF document into a page image.
pub trait PageRasterizer: Send + Sync {
    /// Renders the first page of `pdf_path` as a PNG under
    /// `output_prefix`, returning the path of the produced image.
    fn rasterize_first_page(
        &self,
        pdf_path: &Path,
        output_prefix: &Path,
    ) -> Result<PathBuf, RasterError>;
}

/// pdftoppm-backed rasterizer.
pub struct Rasterizer {
    dpi: u32,
}

impl Rasterizer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }
}

impl PageRasterizer for Rasterizer {
    fn rasterize_first_page(
        &self,
        pdf_path: &Path,
        output_prefix: &Path,
    ) -> Result<PathBuf, RasterError> {
        let pdf_bytes = std::fs::read(pdf_path).map_err(|e| RasterError::ReadDocument {
            path: pdf_path.to_path_buf(),
            source: e,
        })?;

        // Validate before shelling out. pdftoppm error output for broken
        // documents is far less useful than lopdf's parse error.
        let doc = lopdf::Document::load_mem(&pdf_bytes).map_err(|e| RasterError::InvalidPdf {
            path: pdf_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if doc.is_encrypted() {
            return Err(RasterError::Encrypted {
                path: pdf_path.to_path_buf(),
            });
        }
        if doc.get_pages().is_empty() {
            return Err(RasterError::InvalidPdf {
                path: pdf_path.to_path_buf(),
                reason: "document has no pages".to_string(),
            });
        }

        let output = Command::new("pdftoppm")
            .args(["-png", "-r", &self.dpi.to_string(), "-f", "1", "-l", "1"])
            .arg(pdf_path)
            .arg(output_prefix)
            .output()
            .map_err(|e| {
                RasterError::RasterizeFailed(format!(
                    "Failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                    e
                ))
            })?;

        if !output.status.success() {
            remove_candidates(output_prefix);
            return Err(RasterError::RasterizeFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        // pdftoppm pads the page-number suffix to the document's page
        // count width.
        candidate_paths(output_prefix)
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| RasterError::MissingOutput {
                path: pdf_path.to_path_buf(),
            })
    }
}

fn candidate_paths(output_prefix: &Path) -> [PathBuf; 3] {
    [
        PathBuf::from(format!("{}-1.png", output_prefix.display())),
        PathBuf::from(format!("{}-01.png", output_prefix.display())),
        PathBuf::from(format!("{}-001.png", output_prefix.display())),
    ]
}

fn remove_candidates(output_prefix: &Path) {
    for path in candidate_paths(output_prefix) {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_document_fails_with_read_error() {
        let dir = TempDir::new().unwrap();
        let rasterizer = Rasterizer::new(300);

        let result = rasterizer
            .rasterize_first_page(Path::new("/nonexistent/file.pdf"), &dir.path().join("page"));

        match result {
            Err(RasterError::ReadDocument { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/file.pdf"));
            }
            other => panic!("Expected ReadDocument error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_pdf_fails_before_rendering() {
        let dir = TempDir::new().unwrap();
        let pdf_path = dir.path().join("broken.pdf");
        std::fs::write(&pdf_path, b"not a valid pdf content").unwrap();

        let rasterizer = Rasterizer::new(300);
        let result = rasterizer.rasterize_first_page(&pdf_path, &dir.path().join("page"));

        assert!(matches!(result, Err(RasterError::InvalidPdf { .. })));
    }

    #[test]
    fn test_pdf_without_pages_is_rejected() {
        use lopdf::{dictionary, Document};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<lopdf::Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let dir = TempDir::new().unwrap();
        let pdf_path = dir.path().join("empty.pdf");
        doc.save(&pdf_path).unwrap();

        let rasterizer = Rasterizer::new(300);
        let result = rasterizer.rasterize_first_page(&pdf_path, &dir.path().join("page"));

        match result {
            Err(RasterError::InvalidPdf { reason, .. }) => {
                assert!(reason.contains("no pages"), "unexpected reason: {}", reason);
            }
            other => panic!("Expected InvalidPdf error, got {:?}", other),
        }
    }

    #[test]
    fn test_candidate_paths_cover_pdftoppm_padding() {
        let paths = candidate_paths(Path::new("/tmp/claim-image-1"));
        assert_eq!(paths[0], Path::new("/tmp/claim-image-1-1.png"));
        assert_eq!(paths[1], Path::new("/tmp/claim-image-1-01.png"));
        assert_eq!(paths[2], Path::new("/tmp/claim-image-1-001.png"));
    }
}
