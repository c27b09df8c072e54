//! `rfr-monitor` library crate.
//!
//! The binary (`rfr`) is a thin wrapper around this library so that:
//!
//! - the store and comparison logic is testable without spawning processes
//! - the extractor side can feed observations in-process instead of via JSON
//! - code stays easy to navigate as the project grows

pub mod anchor;
pub mod app;
pub mod cli;
pub mod compare;
pub mod config;
pub mod domain;
pub mod error;
pub mod io;
pub mod plot;
pub mod report;
pub mod store;
