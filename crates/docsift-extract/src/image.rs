//! Image content extractor.
//!
//! Images have no text layer, so every image goes through a single OCR pass.

use async_trait::async_trait;
use docsift_core::{ContentExtractor, DocumentFormat, ExtractError, ExtractedText, SourceDocument};
use image::GenericImageView;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

use crate::ocr::OcrEngine;

/// Extractor for raster images.
pub struct ImageExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    /// Create a new image extractor backed by `ocr`.
    #[must_use]
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl ContentExtractor for ImageExtractor {
    fn formats(&self) -> &[DocumentFormat] {
        &[
            DocumentFormat::Png,
            DocumentFormat::Jpeg,
            DocumentFormat::Tiff,
            DocumentFormat::Bmp,
            DocumentFormat::Gif,
        ]
    }

    async fn extract(
        &self,
        document: &SourceDocument,
        format: DocumentFormat,
    ) -> Result<ExtractedText, ExtractError> {
        debug!("Extracting image: {:?} ({})", document.filename(), format);

        let bytes = document.shared_bytes();
        let ocr = Arc::clone(&self.ocr);

        tokio::task::spawn_blocking(move || {
            let png = normalize_image(&bytes)?;
            let text = ocr.recognize(&png)?;
            Ok(ExtractedText::ocr(text))
        })
        .await
        .map_err(|e| ExtractError::Failed(format!("Task join error: {e}")))?
    }
}

/// Decode an image and re-encode it as PNG so the OCR engine sees one format.
fn normalize_image(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let img = image::load_from_memory(bytes).map_err(|e| ExtractError::parse("image", e))?;

    let (width, height) = img.dimensions();
    debug!("Decoded {}x{} image", width, height);

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .map_err(|e| ExtractError::Failed(format!("Image re-encode failed: {e}")))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrError;
    use docsift_core::ExtractionMethod;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Create a simple 2x2 image in `format`.
    fn create_test_image(format: image::ImageFormat) -> Vec<u8> {
        use image::{ImageBuffer, Rgb};

        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(2, 2, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255, 0, 0])
            } else {
                Rgb([0, 255, 0])
            }
        });

        let mut bytes: Vec<u8> = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
        bytes
    }

    /// OCR engine that checks it was handed a PNG.
    #[derive(Default)]
    struct PngCheckingOcr {
        calls: AtomicUsize,
    }

    impl OcrEngine for PngCheckingOcr {
        fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !image.starts_with(b"\x89PNG") {
                return Err(OcrError::Recognition("expected png".to_string()));
            }
            Ok("INVOICE 42".to_string())
        }

        fn name(&self) -> &str {
            "png-checking"
        }
    }

    fn extractor() -> (ImageExtractor, Arc<PngCheckingOcr>) {
        let ocr = Arc::new(PngCheckingOcr::default());
        (ImageExtractor::new(ocr.clone()), ocr)
    }

    #[test]
    fn test_formats_cover_raster_images() {
        let (extractor, _) = extractor();
        assert!(extractor.can_extract(DocumentFormat::Png));
        assert!(extractor.can_extract(DocumentFormat::Tiff));
        assert!(!extractor.can_extract(DocumentFormat::Pdf));
    }

    #[tokio::test]
    async fn test_extract_png_runs_ocr_once() {
        let (extractor, ocr) = extractor();
        let document = SourceDocument::new(
            create_test_image(image::ImageFormat::Png),
            Some("scan.png".to_string()),
        );

        let result = extractor
            .extract(&document, DocumentFormat::Png)
            .await
            .unwrap();

        assert_eq!(result.text, "INVOICE 42");
        assert_eq!(result.method, ExtractionMethod::Ocr);
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_jpeg_is_converted_to_png() {
        let (extractor, ocr) = extractor();
        let document =
            SourceDocument::new(create_test_image(image::ImageFormat::Jpeg), None);

        let result = extractor
            .extract(&document, DocumentFormat::Jpeg)
            .await
            .unwrap();

        assert_eq!(result.text, "INVOICE 42");
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_extract_bmp() {
        let (extractor, _) = extractor();
        let document = SourceDocument::new(create_test_image(image::ImageFormat::Bmp), None);

        let result = extractor.extract(&document, DocumentFormat::Bmp).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_image_is_parse_error() {
        let (extractor, ocr) = extractor();
        let mut bytes = create_test_image(image::ImageFormat::Png);
        bytes.truncate(20);
        let document = SourceDocument::new(bytes, Some("broken.png".to_string()));

        let err = extractor
            .extract(&document, DocumentFormat::Png)
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractError::Parse(_)));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ocr_unavailable_is_failure() {
        struct MissingOcr;
        impl OcrEngine for MissingOcr {
            fn recognize(&self, _image: &[u8]) -> Result<String, OcrError> {
                Err(OcrError::Unavailable("tesseract".to_string()))
            }
            fn name(&self) -> &str {
                "missing"
            }
        }

        let extractor = ImageExtractor::new(Arc::new(MissingOcr));
        let document = SourceDocument::new(create_test_image(image::ImageFormat::Png), None);

        let err = extractor
            .extract(&document, DocumentFormat::Png)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Failed(_)));
    }

    #[test]
    fn test_normalize_image_produces_png() {
        let png = normalize_image(&create_test_image(image::ImageFormat::Gif)).unwrap();
        assert!(png.starts_with(b"\x89PNG"));
    }
}
