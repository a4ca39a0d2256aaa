//! Core library for OCR of scanned Brazilian documents.
//!
//! This crate provides:
//! - PDF rasterization (embedded page scans recovered with lopdf)
//! - OCR backends (PaddleOCR via pure-onnx-ocr, or tesseract) and image preprocessing
//! - Pattern detection for CNPJ, CPF, dates, Real amounts, percentages, phones, emails and URLs
//! - Aggregation into a paged transcript with a summary, and block filtering

pub mod document;
pub mod error;
pub mod models;
pub mod ocr;
pub mod patterns;
pub mod pdf;

pub use document::{aggregate, filter, Aggregator, BlockType, DocumentProcessor};
pub use error::{BrdocError, OcrError, PdfError, Result};
pub use models::{BrdocConfig, DocumentResult, FilteredResult, PageText, Summary};
pub use ocr::{create_backend, ImagePreprocessor, OcrBackend};
pub use patterns::{detect, detect_all, PatternCategory, PatternDetector, PatternMap};
pub use pdf::{PdfExtractor, RasterPage, Rasterizer};
