//! Domain types used throughout the monitor.
//!
//! This module defines:
//!
//! - normalized observations (`Observation`, `CurveMetadata`) and their store key
//! - comparison outputs (`AnalysisResult`, `CurveDeltas`, `Alert`)
//! - the country code table (`country`)

pub mod country;
pub mod types;

pub use types::*;
