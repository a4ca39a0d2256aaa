//! Pattern detection over OCR transcripts.
//!
//! Each category is scanned independently, left to right, without overlap
//! inside a category. The same substring may therefore be reported under
//! several categories.

mod detector;
pub mod rules;

pub use detector::{detect, detect_all, PatternDetector, PatternMatch};

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Matches per category, ordered by category declaration order.
pub type PatternMap = BTreeMap<PatternCategory, Vec<String>>;

/// Closed set of pattern families.
///
/// Serialized names are the keys the web frontend reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PatternCategory {
    /// Corporate tax ID (CNPJ).
    #[serde(rename = "cnpj")]
    Cnpj,
    /// Individual tax ID (CPF).
    #[serde(rename = "cpf")]
    Cpf,
    #[serde(rename = "dates")]
    Date,
    #[serde(rename = "currency")]
    Currency,
    #[serde(rename = "percentages")]
    Percentage,
    #[serde(rename = "phones")]
    Phone,
    #[serde(rename = "emails")]
    Email,
    #[serde(rename = "urls")]
    Url,
}

impl PatternCategory {
    /// Every category, in declaration order.
    pub const ALL: [PatternCategory; 8] = [
        Self::Cnpj,
        Self::Cpf,
        Self::Date,
        Self::Currency,
        Self::Percentage,
        Self::Phone,
        Self::Email,
        Self::Url,
    ];

    /// Wire key for this category.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Cnpj => "cnpj",
            Self::Cpf => "cpf",
            Self::Date => "dates",
            Self::Currency => "currency",
            Self::Percentage => "percentages",
            Self::Phone => "phones",
            Self::Email => "emails",
            Self::Url => "urls",
        }
    }

    /// Human-readable name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Cnpj => "CNPJ",
            Self::Cpf => "CPF",
            Self::Date => "Dates",
            Self::Currency => "Currency",
            Self::Percentage => "Percentages",
            Self::Phone => "Phone",
            Self::Email => "Email",
            Self::Url => "URLs",
        }
    }
}

impl std::fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for PatternCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pattern category: {}", s))
    }
}
