//! Error types for fashion operations.
//!
//! This module defines the canonical error type used throughout the engine.
//! Most of the pipeline's failures are *recoverable* (see `core::log`) and
//! never reach here; `FashionError` is reserved for the fatal cases spec'd
//! in the error handling design (missing project, unrecoverable store I/O).

use std::io;
use thiserror::Error;

/// Canonical error type for fatal fashion operations.
#[derive(Error, Debug)]
pub enum FashionError {
    /// No portfolio found searching upward from the start directory.
    #[error("no fashion project found")]
    MissingProject,

    /// I/O error (auto-converts from `std::io::Error`)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Path resolution or validation error.
    #[error("path error: {0}")]
    PathError(String),

    /// Model store could not be opened or persisted.
    #[error("store error: {0}")]
    StoreError(String),

    /// A name (kind, segment, service, object) failed format validation.
    #[error("invalid name: {0}")]
    InvalidName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_project_display() {
        assert_eq!(format!("{}", FashionError::MissingProject), "no fashion project found");
    }

    #[test]
    fn test_path_error_display() {
        let err = FashionError::PathError("outside project root".to_string());
        assert_eq!(format!("{}", err), "path error: outside project root");
    }

    #[test]
    fn test_invalid_name_display() {
        let err = FashionError::InvalidName("bad kind".to_string());
        assert_eq!(format!("{}", err), "invalid name: bad kind");
    }
}
