//! Input helpers.
//!
//! - extractor JSON ingest + field validation (`ingest`)

pub mod ingest;

pub use ingest::*;
