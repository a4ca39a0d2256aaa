//! Pattern detector scanning a transcript category by category.

use tracing::debug;

use super::rules::rule_for;
use super::{PatternCategory, PatternMap};

/// A single match with its byte span in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Category that matched.
    pub category: PatternCategory,
    /// Matched text.
    pub value: String,
    /// Byte offsets `(start, end)` of `value` in the scanned text.
    pub position: (usize, usize),
}

/// Stateless detector over the fixed category set.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternDetector;

impl PatternDetector {
    pub fn new() -> Self {
        Self
    }

    /// Every match of `category` in `text`, in scan order.
    pub fn detect_with_positions(&self, category: PatternCategory, text: &str) -> Vec<PatternMatch> {
        rule_for(category)
            .find_iter(text)
            .map(|m| {
                let value = match category {
                    // The leading `\s*` of the phone rule can swallow the gap before the number.
                    PatternCategory::Phone => m.as_str().trim_start(),
                    _ => m.as_str(),
                };
                PatternMatch {
                    category,
                    value: value.to_string(),
                    position: (m.end() - value.len(), m.end()),
                }
            })
            .collect()
    }

    /// Matched substrings of `category` in `text`, duplicates included.
    pub fn detect(&self, category: PatternCategory, text: &str) -> Vec<String> {
        self.detect_with_positions(category, text)
            .into_iter()
            .map(|m| m.value)
            .collect()
    }

    /// Scan `text` for every category.
    pub fn detect_all(&self, text: &str) -> PatternMap {
        let patterns: PatternMap = PatternCategory::ALL
            .into_iter()
            .map(|category| (category, self.detect(category, text)))
            .collect();

        debug!(
            "Detected {} pattern matches in {} bytes of text",
            patterns.values().map(Vec::len).sum::<usize>(),
            text.len()
        );

        patterns
    }
}

/// Matched substrings of `category` in `text`.
pub fn detect(category: PatternCategory, text: &str) -> Vec<String> {
    PatternDetector::new().detect(category, text)
}

/// Scan `text` for every category.
pub fn detect_all(text: &str) -> PatternMap {
    PatternDetector::new().detect_all(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_detect_cnpj() {
        assert_eq!(
            detect(PatternCategory::Cnpj, "CNPJ: 12.345.678/0001-99"),
            vec!["12.345.678/0001-99"]
        );
    }

    #[test]
    fn test_cnpj_without_punctuation_is_ignored() {
        assert!(detect(PatternCategory::Cnpj, "CNPJ 12345678000199").is_empty());
    }

    #[test]
    fn test_detect_cpf_keeps_duplicates() {
        let text = "CPF 123.456.789-09, titular 123.456.789-09";
        assert_eq!(
            detect(PatternCategory::Cpf, text),
            vec!["123.456.789-09", "123.456.789-09"]
        );
    }

    #[test]
    fn test_no_checksum_validation() {
        // Check digits are wrong on purpose.
        assert_eq!(
            detect(PatternCategory::Cpf, "000.000.000-00"),
            vec!["000.000.000-00"]
        );
    }

    #[test]
    fn test_detect_dates() {
        let text = "Emissão: 05/01/2024, vencimento 5-2-2024";
        assert_eq!(
            detect(PatternCategory::Date, text),
            vec!["05/01/2024", "5-2-2024"]
        );
    }

    #[test]
    fn test_date_shape_inside_longer_number() {
        assert_eq!(
            detect(PatternCategory::Date, "Processo 123/45/20245"),
            vec!["23/45/2024"]
        );
    }

    #[test]
    fn test_detect_currency() {
        let text = "Subtotal R$ 1.234,56 e frete R$80,00";
        assert_eq!(
            detect(PatternCategory::Currency, text),
            vec!["R$ 1.234,56", "R$80,00"]
        );
    }

    #[test]
    fn test_currency_run_takes_trailing_separator() {
        assert_eq!(
            detect(PatternCategory::Currency, "Total R$ 100,00."),
            vec!["R$ 100,00."]
        );
    }

    #[test]
    fn test_detect_percentages() {
        let text = "Alíquota de 17,5 % e desconto de 10%";
        assert_eq!(
            detect(PatternCategory::Percentage, text),
            vec!["17,5 %", "10%"]
        );
    }

    #[test]
    fn test_detect_phones() {
        let text = "Tel: (11) 98765-4321 / +55 21 3333-4444\nFax 33334444";
        assert_eq!(
            detect(PatternCategory::Phone, text),
            vec!["(11) 98765-4321", "+55 21 3333-4444", "33334444"]
        );
    }

    #[test]
    fn test_email_and_url() {
        let text = "email me at a.b@example.com or visit https://example.com/x";

        assert_eq!(detect(PatternCategory::Email, text), vec!["a.b@example.com"]);
        assert_eq!(detect(PatternCategory::Url, text), vec!["https://example.com/x"]);
    }

    #[test]
    fn test_email_requires_alpha_tld() {
        assert!(detect(PatternCategory::Email, "user@host.1").is_empty());
    }

    #[test]
    fn test_matches_do_not_overlap() {
        let detector = PatternDetector::new();
        let text = "11/11/2024-11/11/2024 12.345.678/0001-99.345.678/0001-99 R$ 1,0 R$2";

        for category in PatternCategory::ALL {
            let matches = detector.detect_with_positions(category, text);
            for pair in matches.windows(2) {
                assert!(
                    pair[0].position.1 <= pair[1].position.0,
                    "{} matches overlap: {:?}",
                    category,
                    pair
                );
            }
            for m in &matches {
                assert!(rule_for(category).is_match(&m.value));
            }
        }
    }

    #[test]
    fn test_categories_are_independent() {
        let patterns = detect_all("Pago em 10/05/2024: R$ 10/05/2024");

        assert_eq!(
            patterns[&PatternCategory::Date],
            vec!["10/05/2024", "10/05/2024"]
        );
        assert_eq!(patterns[&PatternCategory::Currency], vec!["R$ 10"]);
    }

    #[test]
    fn test_detect_all_covers_every_category() {
        let patterns = detect_all("nothing to see here");

        assert_eq!(patterns.len(), PatternCategory::ALL.len());
        assert!(patterns.values().all(Vec::is_empty));
    }

    #[test]
    fn test_garbled_text_yields_nothing() {
        let patterns = detect_all("\u{fffd}\u{fffd} ~~ |||| @@ R$ ..");
        assert_eq!(patterns[&PatternCategory::Currency], vec!["R$ .."]);
        assert!(patterns[&PatternCategory::Email].is_empty());
    }

    #[test]
    fn test_position_spans_the_value() {
        let detector = PatternDetector::new();
        let text = "Tel: (11) 98765-4321";

        let phones = detector.detect_with_positions(PatternCategory::Phone, text);
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].value, "(11) 98765-4321");
        assert_eq!(phones[0].position, (5, 20));

        let text = "CNPJ 12.345.678/0001-99 contato: (21) 3333-4444 total R$ 10,00";
        for category in PatternCategory::ALL {
            for m in detector.detect_with_positions(category, text) {
                assert_eq!(&text[m.position.0..m.position.1], m.value);
            }
        }
    }
}
