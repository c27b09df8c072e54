//! Error types.
//!
//! Two layers:
//!
//! - typed core errors (`StoreError`, `InvalidObservation`) returned by the store
//!   and the ingest path; callers decide whether they are fatal
//! - `AppError`, the CLI-level error carrying a process exit code

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::Maturity;

/// Exit code for invalid configuration or unreadable input files.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for a lookup that found nothing to work on.
pub const EXIT_MISSING_DATA: u8 = 3;
/// Exit code for a store that exists but cannot be loaded.
pub const EXIT_STORE_READ: u8 = 4;
/// Exit code for a store mutation that could not be persisted.
pub const EXIT_STORE_WRITE: u8 = 5;

/// Errors raised by the historical store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing file exists but could not be read or parsed.
    #[error("failed to load historical store '{}': {message}", path.display())]
    Read { path: PathBuf, message: String },

    /// The in-memory mutation succeeded but the backing file was not rewritten.
    #[error("failed to persist historical store '{}': {message}", path.display())]
    Write { path: PathBuf, message: String },
}

impl StoreError {
    pub(crate) fn read(path: &Path, message: impl Into<String>) -> Self {
        Self::Read {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn write(path: &Path, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// A single value of an incoming observation that failed validation.
///
/// The offending field is dropped; the rest of the record still proceeds.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidObservation {
    #[error("rate {rate} at {maturity}Y is outside [{min}, {max}]")]
    RateOutOfRange {
        maturity: Maturity,
        rate: f64,
        min: f64,
        max: f64,
    },

    #[error("VA {va} is outside [{min}, {max}]")]
    VaOutOfRange { va: f64, min: f64, max: f64 },

    #[error("maturity {maturity}Y is not one of the configured maturities")]
    UnknownMaturity { maturity: Maturity },
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let exit_code = match err {
            StoreError::Read { .. } => EXIT_STORE_READ,
            StoreError::Write { .. } => EXIT_STORE_WRITE,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_distinct_exit_codes() {
        let read: AppError = StoreError::read(Path::new("h.csv"), "bad header").into();
        let write: AppError = StoreError::write(Path::new("h.csv"), "disk full").into();
        assert_eq!(read.exit_code(), EXIT_STORE_READ);
        assert_eq!(write.exit_code(), EXIT_STORE_WRITE);
        assert!(read.to_string().contains("h.csv"));
        assert!(write.to_string().contains("disk full"));
    }
}
