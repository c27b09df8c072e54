//! Console reporting: analysis results, store statistics and series tables.
//!
//! Formatting lives in one place so the store and comparison code stay free of
//! presentation concerns, and output changes stay covered by golden tests.

mod format;

pub use format::*;
