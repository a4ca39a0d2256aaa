//! End-to-end pipeline: PDF bytes to a document result.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::aggregator::{Aggregator, EMPTY_DOCUMENT};
use crate::error::{PdfError, Result};
use crate::models::config::BrdocConfig;
use crate::models::document::{DocumentResult, PageText};
use crate::ocr::{ImagePreprocessor, OcrBackend};
use crate::pdf::{PdfExtractor, RasterPage, Rasterizer};

/// Error reported when no OCR engine is configured or loadable.
pub const OCR_UNAVAILABLE: &str = "OCR engine not available";

/// Runs rasterization, preprocessing, OCR and aggregation for one document.
///
/// Built once and shared; processing holds no state between documents.
pub struct DocumentProcessor {
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Option<Arc<dyn OcrBackend>>,
    preprocessor: ImagePreprocessor,
    aggregator: Aggregator,
    dpi: u32,
}

impl DocumentProcessor {
    /// Create a processor from explicit collaborators and default settings.
    pub fn new(rasterizer: Arc<dyn Rasterizer>, ocr: Option<Arc<dyn OcrBackend>>) -> Self {
        Self {
            rasterizer,
            ocr,
            preprocessor: ImagePreprocessor::new(),
            aggregator: Aggregator::new(),
            dpi: 200,
        }
    }

    /// Create a processor using the lopdf rasterizer and `config`.
    pub fn from_config(config: &BrdocConfig, ocr: Option<Arc<dyn OcrBackend>>) -> Self {
        let rasterizer = PdfExtractor::new()
            .with_max_pages(config.pdf.max_pages)
            .with_max_image_size(config.pdf.max_image_size);

        Self {
            rasterizer: Arc::new(rasterizer),
            ocr,
            preprocessor: ImagePreprocessor::from_config(&config.preprocessing),
            aggregator: Aggregator::new().with_extract_patterns(config.extraction.extract_patterns),
            dpi: config.pdf.render_dpi,
        }
    }

    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn with_aggregator(mut self, aggregator: Aggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// The OCR backend in use, if any.
    pub fn ocr(&self) -> Option<&dyn OcrBackend> {
        self.ocr.as_deref()
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    /// Process a PDF held in memory.
    ///
    /// Never fails: document-level problems come back as `success == false`,
    /// page-level problems as placeholders.
    pub fn process(&self, data: &[u8]) -> DocumentResult {
        let start = Instant::now();

        let Some(ocr) = self.ocr.as_deref() else {
            warn!("Rejecting document: no OCR engine");
            return DocumentResult::failure(OCR_UNAVAILABLE);
        };

        info!("Converting PDF ({} bytes) to images at {} DPI", data.len(), self.dpi);

        let raster_pages = match self.rasterizer.rasterize(data, self.dpi) {
            Ok(pages) => pages,
            Err(PdfError::NoPages) => return DocumentResult::failure(EMPTY_DOCUMENT),
            Err(e) => {
                warn!("Rasterization failed: {}", e);
                return DocumentResult::failure(format!("Error processing PDF: {}", e));
            }
        };

        let total = raster_pages.len();
        let pages: Vec<PageText> = raster_pages
            .into_iter()
            .map(|page| {
                debug!("Processing page {}/{}", page.number, total);
                self.recognize_page(ocr, page)
            })
            .collect();

        let result = self.aggregator.aggregate(pages);

        info!(
            "Processed {} pages in {}ms",
            total,
            start.elapsed().as_millis()
        );

        result
    }

    /// Read and process a PDF file.
    pub fn process_file(&self, path: &Path) -> Result<DocumentResult> {
        let data = std::fs::read(path)?;
        Ok(self.process(&data))
    }

    fn recognize_page(&self, ocr: &dyn OcrBackend, page: RasterPage) -> PageText {
        let image = match page.image {
            Ok(image) => image,
            Err(e) => {
                warn!("Page {}: {}", page.number, e);
                return PageText::failed(page.number, e.to_string());
            }
        };

        let prepared = self.preprocessor.process(&image);

        match ocr.recognize(&prepared) {
            Ok(text) => {
                let page_text = PageText::new(page.number, text);
                if page_text.is_failed() {
                    warn!("Page {}: no text recognized", page.number);
                }
                page_text
            }
            Err(e) => {
                warn!("Page {}: {}", page.number, e);
                PageText::failed(page.number, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::pdf;
    use crate::patterns::PatternCategory;
    use image::{DynamicImage, GenericImageView};
    use pretty_assertions::assert_eq;

    /// Produces one image per requested page; page width encodes the page number.
    struct StubRasterizer {
        pages: Vec<Option<u32>>,
    }

    impl Rasterizer for StubRasterizer {
        fn rasterize(&self, _data: &[u8], _dpi: u32) -> pdf::Result<Vec<RasterPage>> {
            if self.pages.is_empty() {
                return Err(PdfError::NoPages);
            }
            Ok(self
                .pages
                .iter()
                .enumerate()
                .map(|(i, page)| RasterPage {
                    number: i as u32 + 1,
                    image: page
                        .map(|width| DynamicImage::new_luma8(width, 4))
                        .ok_or_else(|| PdfError::ImageExtraction("no image".to_string())),
                })
                .collect())
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn rasterize(&self, _data: &[u8], _dpi: u32) -> pdf::Result<Vec<RasterPage>> {
            Err(PdfError::Parse("not a PDF".to_string()))
        }
    }

    /// Maps image width to canned transcripts.
    struct StubOcr;

    impl OcrBackend for StubOcr {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn recognize(&self, image: &DynamicImage) -> std::result::Result<String, OcrError> {
            match image.dimensions().0 {
                1 => Ok("Razão social LTDA\nCNPJ 12.345.678/0001-99".to_string()),
                2 => Ok("Total: R$ 1.234,56 (10%)".to_string()),
                3 => Ok(String::new()),
                _ => Err(OcrError::Recognition("model crashed".to_string())),
            }
        }
    }

    fn processor(pages: Vec<Option<u32>>) -> DocumentProcessor {
        DocumentProcessor::new(Arc::new(StubRasterizer { pages }), Some(Arc::new(StubOcr)))
    }

    #[test]
    fn test_process_document() {
        let result = processor(vec![Some(1), Some(2)]).process(b"%PDF");

        assert!(result.success);
        assert_eq!(result.total_pages, Some(2));
        let patterns = result.patterns.unwrap();
        assert_eq!(patterns[&PatternCategory::Cnpj], vec!["12.345.678/0001-99"]);
        assert_eq!(patterns[&PatternCategory::Currency], vec!["R$ 1.234,56"]);
    }

    #[test]
    fn test_page_failures_become_placeholders() {
        let result = processor(vec![Some(1), None, Some(3), Some(9)]).process(b"%PDF");

        assert!(result.success);
        let pages = result.pages.unwrap();
        assert_eq!(pages.len(), 4);
        for page in &pages[1..] {
            assert!(page.is_failed());
            assert_eq!(
                page.text(),
                format!("[Page {}: Unable to extract text]", page.page())
            );
        }
        assert!(!pages[0].is_failed());
    }

    #[test]
    fn test_missing_engine_fails_document() {
        let processor = DocumentProcessor::new(
            Arc::new(StubRasterizer { pages: vec![Some(1)] }),
            None,
        );
        let result = processor.process(b"%PDF");

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(OCR_UNAVAILABLE));
    }

    #[test]
    fn test_empty_document() {
        let result = processor(Vec::new()).process(b"%PDF");

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(EMPTY_DOCUMENT));
    }

    #[test]
    fn test_unreadable_document() {
        let processor = DocumentProcessor::new(Arc::new(FailingRasterizer), Some(Arc::new(StubOcr)));
        let result = processor.process(b"garbage");

        assert!(!result.success);
        assert!(result.error.unwrap().contains("not a PDF"));
    }

    #[test]
    fn test_process_missing_file() {
        let result = processor(vec![Some(1)]).process_file(Path::new("/nonexistent/scan.pdf"));
        assert!(matches!(result, Err(crate::error::BrdocError::Io(_))));
    }
}
