//! Assembly of per-page transcripts into a document result.

use tracing::{debug, info};

use crate::models::document::{count_lines, DocumentResult, PageText, Summary};
use crate::patterns::{PatternDetector, PatternMap};

/// Error reported when there is nothing to aggregate.
pub const EMPTY_DOCUMENT: &str = "PDF appears to be empty or corrupted";

/// Marker placed before each page's text in the full transcript.
pub fn page_marker(page: u32) -> String {
    format!("\n--- PAGE {} ---\n", page)
}

/// Builds the full transcript, pattern map and summary.
#[derive(Debug, Clone)]
pub struct Aggregator {
    detector: PatternDetector,
    extract_patterns: bool,
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            detector: PatternDetector::new(),
            extract_patterns: true,
        }
    }

    /// Skip pattern detection; `patterns` is then empty.
    pub fn with_extract_patterns(mut self, extract_patterns: bool) -> Self {
        self.extract_patterns = extract_patterns;
        self
    }

    /// Combine pages, in any order, into a document result.
    pub fn aggregate(&self, mut pages: Vec<PageText>) -> DocumentResult {
        if pages.is_empty() {
            return DocumentResult::failure(EMPTY_DOCUMENT);
        }

        pages.sort_by_key(PageText::page);

        let mut full_text = String::new();
        for page in &pages {
            full_text.push_str(&page_marker(page.page()));
            full_text.push_str(page.text());
            full_text.push('\n');
        }

        let patterns = if self.extract_patterns {
            self.detector.detect_all(&full_text)
        } else {
            PatternMap::new()
        };

        let summary = Summary {
            total_characters: full_text.chars().count(),
            total_lines: count_lines(&full_text),
            unique_patterns: patterns.values().map(Vec::len).sum(),
        };

        let failed = pages.iter().filter(|p| p.is_failed()).count();
        if failed > 0 {
            debug!("{} of {} pages carry a placeholder", failed, pages.len());
        }
        info!(
            "Aggregated {} pages: {} characters, {} pattern matches",
            pages.len(),
            summary.total_characters,
            summary.unique_patterns
        );

        DocumentResult::completed(pages, full_text, patterns, summary)
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate with pattern detection enabled.
pub fn aggregate(pages: Vec<PageText>) -> DocumentResult {
    Aggregator::new().aggregate(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::PatternCategory;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_pages_is_failure() {
        let result = aggregate(Vec::new());

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(EMPTY_DOCUMENT));
        assert!(result.pages.is_none());
        assert!(result.patterns.is_none());
        assert!(result.full_text.is_none());
    }

    #[test]
    fn test_currency_and_percentage_summary() {
        let result = aggregate(vec![PageText::new(1, "Total: R$ 1.234,56 (10%)")]);
        let patterns = result.patterns.as_ref().unwrap();

        assert!(result.success);
        assert_eq!(patterns[&PatternCategory::Currency], vec!["R$ 1.234,56"]);
        assert_eq!(patterns[&PatternCategory::Percentage], vec!["10%"]);
        assert_eq!(result.summary.unwrap().unique_patterns, 2);
    }

    #[test]
    fn test_full_text_layout() {
        let result = aggregate(vec![PageText::new(1, "linha um\nlinha dois")]);
        let full_text = result.full_text.unwrap();

        assert_eq!(full_text, "\n--- PAGE 1 ---\nlinha um\nlinha dois\n");

        let summary = result.summary.unwrap();
        assert_eq!(summary.total_characters, full_text.chars().count());
        assert_eq!(summary.total_lines, 5);
    }

    #[test]
    fn test_pages_ordered_by_number() {
        let result = aggregate(vec![
            PageText::new(3, "terceira"),
            PageText::new(1, "primeira"),
            PageText::new(2, "segunda"),
        ]);
        let full_text = result.full_text.unwrap();

        assert_eq!(full_text.matches("--- PAGE ").count(), 3);
        let first = full_text.find("--- PAGE 1 ---").unwrap();
        let second = full_text.find("--- PAGE 2 ---").unwrap();
        let third = full_text.find("--- PAGE 3 ---").unwrap();
        assert!(first < second && second < third);

        let numbers: Vec<u32> = result.pages.unwrap().iter().map(PageText::page).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(result.total_pages, Some(3));
    }

    #[test]
    fn test_empty_page_keeps_document_successful() {
        let result = aggregate(vec![PageText::new(1, "CPF 123.456.789-09"), PageText::new(2, "")]);

        assert!(result.success);
        let pages = result.pages.unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[1].text().contains('2'));
        assert!(pages[1].is_failed());
        assert!(result.full_text.unwrap().contains("[Page 2: Unable to extract text]"));
    }

    #[test]
    fn test_duplicates_across_pages_are_kept() {
        let result = aggregate(vec![
            PageText::new(1, "contato@empresa.com.br"),
            PageText::new(2, "contato@empresa.com.br"),
        ]);

        assert_eq!(
            result.patterns.unwrap()[&PatternCategory::Email],
            vec!["contato@empresa.com.br", "contato@empresa.com.br"]
        );
    }

    #[test]
    fn test_pattern_extraction_disabled() {
        let result = Aggregator::new()
            .with_extract_patterns(false)
            .aggregate(vec![PageText::new(1, "R$ 10,00")]);

        assert!(result.success);
        assert!(result.patterns.unwrap().is_empty());
        assert_eq!(result.summary.unwrap().unique_patterns, 0);
    }
}
