//! Block filtering: restrict a document's patterns to one family of categories.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BrdocError, Result};
use crate::models::document::{DocumentResult, FilteredResult};
use crate::patterns::{PatternCategory, PatternMap};

/// Category families a caller can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    /// Identification and contact data.
    #[default]
    General,
    /// Monetary amounts and rates.
    Finance,
    /// Every category.
    All,
}

impl BlockType {
    /// Categories kept by this block.
    pub fn categories(&self) -> &'static [PatternCategory] {
        match self {
            Self::General => &[
                PatternCategory::Cnpj,
                PatternCategory::Cpf,
                PatternCategory::Date,
                PatternCategory::Phone,
                PatternCategory::Email,
            ],
            Self::Finance => &[PatternCategory::Currency, PatternCategory::Percentage],
            Self::All => &PatternCategory::ALL,
        }
    }

    /// Parse a block name; anything unrecognized selects every category.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_else(|_| {
            debug!("Unknown block type '{}', keeping all categories", s);
            Self::All
        })
    }
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::General => "general",
            Self::Finance => "finance",
            Self::All => "all",
        };
        f.write_str(name)
    }
}

impl FromStr for BlockType {
    type Err = String;

    /// Only the exact lowercase names are accepted.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "general" => Ok(Self::General),
            "finance" => Ok(Self::Finance),
            "all" => Ok(Self::All),
            other => Err(format!("unknown block type: {}", other)),
        }
    }
}

/// Keep only the patterns of `block`; text and summary pass through unchanged.
pub fn filter(result: &DocumentResult, block: BlockType) -> Result<FilteredResult> {
    if !result.success {
        return Err(BrdocError::InvalidInput(
            result
                .error
                .clone()
                .unwrap_or_else(|| "extraction failed".to_string()),
        ));
    }

    let source = result.patterns.as_ref();
    let patterns: PatternMap = block
        .categories()
        .iter()
        .map(|category| {
            let matches = source
                .and_then(|p| p.get(category))
                .cloned()
                .unwrap_or_default();
            (*category, matches)
        })
        .collect();

    Ok(FilteredResult {
        success: true,
        full_text: result.full_text.clone().unwrap_or_default(),
        patterns,
        summary: result.summary.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::aggregate;
    use crate::models::document::PageText;
    use pretty_assertions::assert_eq;

    fn sample() -> DocumentResult {
        aggregate(vec![PageText::new(
            1,
            "CNPJ 12.345.678/0001-99\nTotal R$ 1.234,56 com 10% de desconto",
        )])
    }

    #[test]
    fn test_finance_block() {
        let result = sample();
        let filtered = filter(&result, BlockType::Finance).unwrap();

        let keys: Vec<PatternCategory> = filtered.patterns.keys().copied().collect();
        assert_eq!(keys, vec![PatternCategory::Currency, PatternCategory::Percentage]);
        assert_eq!(filtered.patterns[&PatternCategory::Currency], vec!["R$ 1.234,56"]);
        assert_eq!(filtered.patterns[&PatternCategory::Percentage], vec!["10%"]);
        assert_eq!(Some(filtered.full_text), result.full_text);
        assert_eq!(Some(filtered.summary), result.summary);
    }

    #[test]
    fn test_general_block() {
        let filtered = filter(&sample(), BlockType::General).unwrap();

        assert_eq!(filtered.patterns.len(), 5);
        assert_eq!(
            filtered.patterns[&PatternCategory::Cnpj],
            vec!["12.345.678/0001-99"]
        );
        assert!(!filtered.patterns.contains_key(&PatternCategory::Currency));
        assert!(!filtered.patterns.contains_key(&PatternCategory::Url));
    }

    #[test]
    fn test_all_block_keeps_everything() {
        let result = sample();
        let filtered = filter(&result, BlockType::All).unwrap();
        assert_eq!(Some(filtered.patterns), result.patterns);
    }

    #[test]
    fn test_failed_result_is_rejected() {
        let result = DocumentResult::failure("PDF has no pages");
        match filter(&result, BlockType::General) {
            Err(BrdocError::InvalidInput(msg)) => assert_eq!(msg, "PDF has no pages"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_lenient_parse() {
        assert_eq!(BlockType::parse_lenient("finance"), BlockType::Finance);
        assert_eq!(BlockType::parse_lenient("general"), BlockType::General);
        assert_eq!(BlockType::parse_lenient("invoices"), BlockType::All);
    }

    #[test]
    fn test_block_names_are_case_sensitive() {
        assert_eq!(BlockType::parse_lenient("GENERAL"), BlockType::All);
        assert_eq!(BlockType::parse_lenient("Finance"), BlockType::All);
        assert_eq!(BlockType::parse_lenient(" finance"), BlockType::All);
        assert!("General".parse::<BlockType>().is_err());
    }
}
