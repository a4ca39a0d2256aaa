//! Document-level result models returned to API consumers.

use serde::{Deserialize, Serialize};

use crate::patterns::PatternMap;

/// One page's OCR output.
///
/// Counts are derived from `text` at construction and cannot drift from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    page: u32,
    text: String,
    character_count: usize,
    line_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PageText {
    /// Build a page from recognized text.
    ///
    /// Empty or whitespace-only text is replaced by the page placeholder and
    /// flagged with an error marker.
    pub fn new(page: u32, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return Self::failed(page, "no text recognized");
        }
        Self::build(page, text, None)
    }

    /// Build a page whose extraction failed.
    pub fn failed(page: u32, reason: impl Into<String>) -> Self {
        Self::build(page, placeholder(page), Some(reason.into()))
    }

    fn build(page: u32, text: String, error: Option<String>) -> Self {
        Self {
            page,
            character_count: text.chars().count(),
            line_count: count_lines(&text),
            text,
            error,
        }
    }

    /// 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Recognized text, or the placeholder for a failed page.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn character_count(&self) -> usize {
        self.character_count
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Why extraction failed, if it did.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether this page carries a placeholder instead of recognized text.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Placeholder text substituted for a page without recognized text.
pub fn placeholder(page: u32) -> String {
    format!("[Page {}: Unable to extract text]", page)
}

/// Number of lines in `text`: line breaks plus one.
pub fn count_lines(text: &str) -> usize {
    text.matches('\n').count() + 1
}

/// Whole-document statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Characters in the full transcript (Unicode scalar values).
    pub total_characters: usize,
    /// Lines in the full transcript.
    pub total_lines: usize,
    /// Total number of pattern matches across all categories.
    ///
    /// Duplicates are counted; this is not a distinct-value count.
    pub unique_patterns: usize,
}

/// Unified processing outcome for one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentResult {
    /// Whether the document produced a transcript.
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<PageText>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<PatternMap>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<Summary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentResult {
    /// A successful result.
    pub fn completed(
        pages: Vec<PageText>,
        full_text: String,
        patterns: PatternMap,
        summary: Summary,
    ) -> Self {
        Self {
            success: true,
            total_pages: Some(pages.len()),
            pages: Some(pages),
            full_text: Some(full_text),
            patterns: Some(patterns),
            summary: Some(summary),
            error: None,
        }
    }

    /// A document-level failure.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            total_pages: None,
            pages: None,
            full_text: None,
            patterns: None,
            summary: None,
            error: Some(error.into()),
        }
    }
}

/// A successful result narrowed to one block's pattern categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredResult {
    pub success: bool,
    pub full_text: String,
    pub patterns: PatternMap,
    pub summary: Summary,
}
