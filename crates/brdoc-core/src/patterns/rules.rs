//! Surface-syntax rules for Brazilian document patterns.
//!
//! Rules describe shape only. A CNPJ with a wrong check digit still matches.

use lazy_static::lazy_static;
use regex::Regex;

use super::PatternCategory;

lazy_static! {
    // CNPJ (corporate tax ID): 12.345.678/0001-99
    pub static ref CNPJ: Regex = Regex::new(
        r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}"
    ).unwrap();

    // CPF (individual tax ID): 123.456.789-09
    pub static ref CPF: Regex = Regex::new(
        r"\d{3}\.\d{3}\.\d{3}-\d{2}"
    ).unwrap();

    // Day-first dates: 05/01/2024, 5-1-2024
    pub static ref DATE_DMY: Regex = Regex::new(
        r"\d{1,2}[/-]\d{1,2}[/-]\d{4}"
    ).unwrap();

    // Real amounts: R$ 1.234,56
    pub static ref CURRENCY_BRL: Regex = Regex::new(
        r"R\$\s*[\d.,]+"
    ).unwrap();

    // Percentages with optional comma decimal: 17,5 %
    pub static ref PERCENTAGE: Regex = Regex::new(
        r"\d+(?:,\d+)?\s*%"
    ).unwrap();

    // Phones: optional country code, optional area code, 4-5 digits, optional dash, 4 digits
    pub static ref PHONE: Regex = Regex::new(
        r"(?:\+?\d{2})?\s*(?:\(?\d{2}\)?)?\s*\d{4,5}-?\d{4}"
    ).unwrap();

    // Email pattern
    pub static ref EMAIL: Regex = Regex::new(
        r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"
    ).unwrap();

    // http(s) URLs up to the next whitespace
    pub static ref URL: Regex = Regex::new(
        r"https?://[^\s]+"
    ).unwrap();
}

/// The rule backing a category.
pub fn rule_for(category: PatternCategory) -> &'static Regex {
    match category {
        PatternCategory::Cnpj => &CNPJ,
        PatternCategory::Cpf => &CPF,
        PatternCategory::Date => &DATE_DMY,
        PatternCategory::Currency => &CURRENCY_BRL,
        PatternCategory::Percentage => &PERCENTAGE,
        PatternCategory::Phone => &PHONE,
        PatternCategory::Email => &EMAIL,
        PatternCategory::Url => &URL,
    }
}
