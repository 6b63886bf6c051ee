//! Character recognition over page images via Tesseract.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use crate::error::OcrError;

/// Extracts text from a rendered page image.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image_path: &Path) -> Result<String, OcrError>;
}

/// Tesseract-backed recognizer.
#[derive(Clone)]
pub struct OcrEngine {
    inner: Arc<OcrEngineInner>,
}

struct OcrEngineInner {
    languages: String,
}

impl OcrEngine {
    pub fn new(languages: &[String]) -> Self {
        let lang_str = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            inner: Arc::new(OcrEngineInner {
                languages: lang_str,
            }),
        }
    }

    pub fn recognize_bytes(&self, image_data: &[u8]) -> Result<String, OcrError> {
        // Re-encode through the image crate so leptess always sees a
        // clean PNG, whatever the renderer produced.
        let img = image::load_from_memory(image_data)
            .map_err(|e| OcrError::Recognition(format!("Failed to load image: {}", e)))?;

        let mut png_data = Vec::new();
        let mut cursor = Cursor::new(&mut png_data);
        img.write_to(&mut cursor, image::ImageFormat::Png)
            .map_err(|e| OcrError::Recognition(format!("Failed to convert image: {}", e)))?;

        let mut lt = leptess::LepTess::new(None, &self.inner.languages)
            .map_err(|e| OcrError::EngineInit(e.to_string()))?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| OcrError::Recognition(format!("Failed to set image for OCR: {}", e)))?;

        lt.get_utf8_text()
            .map_err(|e| OcrError::Recognition(format!("OCR failed: {}", e)))
    }
}

impl TextRecognizer for OcrEngine {
    fn recognize(&self, image_path: &Path) -> Result<String, OcrError> {
        let image_data = std::fs::read(image_path).map_err(|e| OcrError::ReadImage {
            path: image_path.to_path_buf(),
            source: e,
        })?;
        self.recognize_bytes(&image_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_languages_are_joined() {
        let engine = OcrEngine::new(&["eng".to_string(), "deu".to_string()]);
        assert_eq!(engine.inner.languages, "eng+deu");
    }

    #[test]
    fn test_default_language_is_english() {
        let engine = OcrEngine::new(&[]);
        assert_eq!(engine.inner.languages, "eng");
    }

    #[test]
    fn test_invalid_image_data_error() {
        let engine = OcrEngine::new(&["eng".to_string()]);
        let result = engine.recognize_bytes(b"not valid image data");

        match result {
            Err(OcrError::Recognition(msg)) => {
                assert!(msg.contains("Failed to load image"));
            }
            other => panic!("Expected Recognition error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_image_data_error() {
        let engine = OcrEngine::new(&["eng".to_string()]);
        assert!(matches!(
            engine.recognize_bytes(&[]),
            Err(OcrError::Recognition(_))
        ));
    }

    #[test]
    fn test_nonexistent_image_error() {
        let engine = OcrEngine::new(&["eng".to_string()]);
        let result = engine.recognize(Path::new("/nonexistent/image.png"));

        match result {
            Err(OcrError::ReadImage { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/image.png"));
            }
            other => panic!("Expected ReadImage error, got {:?}", other),
        }
    }

    #[test]
    fn test_engine_is_cheaply_cloneable() {
        let engine = OcrEngine::new(&["eng".to_string()]);
        let cloned = engine.clone();
        assert_eq!(engine.inner.languages, cloned.inner.languages);
    }
}
