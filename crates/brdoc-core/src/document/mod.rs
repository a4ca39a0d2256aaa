//! Document processing: orchestration, aggregation and block filtering.

mod aggregator;
mod block;
mod processor;

pub use aggregator::{aggregate, page_marker, Aggregator, EMPTY_DOCUMENT};
pub use block::{filter, BlockType};
pub use processor::{DocumentProcessor, OCR_UNAVAILABLE};
