//! PDF rasterization module.

mod extractor;

pub use extractor::PdfExtractor;

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// One rasterized page.
///
/// A page whose image could not be recovered keeps its slot so that page
/// numbering stays gapless.
#[derive(Debug)]
pub struct RasterPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Page image, or why it could not be produced.
    pub image: Result<DynamicImage>,
}

/// Turns PDF bytes into page images.
pub trait Rasterizer: Send + Sync {
    /// Rasterize every page at the given DPI, in page order.
    ///
    /// Fails only when the document as a whole is unusable.
    fn rasterize(&self, data: &[u8], dpi: u32) -> Result<Vec<RasterPage>>;
}
