//! Data models shared by the pipeline and its consumers.

pub mod config;
pub mod document;

pub use config::BrdocConfig;
pub use document::{DocumentResult, FilteredResult, PageText, Summary};
