//! Error types for the crashsift-core library.
//!
//! Missing inputs are reported through [`CoreError::DataNotFound`] so callers
//! can decide whether to continue with an empty corpus. Per-record corruption
//! (an unreadable tensor archive, a malformed annotation line) never surfaces
//! here; batch operations count those in a skip report instead.

use std::path::PathBuf;

use thiserror::Error;

/// Custom error type for crashsift-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Tensor archive error: {0}")]
    Npz(String),

    #[error("{what} not found: {}", path.display())]
    DataNotFound { what: &'static str, path: PathBuf },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No videos available for analysis")]
    NoVideos,

    #[error("Scheme {0} not found among candidates")]
    SchemeNotFound(usize),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl CoreError {
    /// Shorthand for a missing-input error.
    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        CoreError::DataNotFound {
            what,
            path: path.into(),
        }
    }

    /// True for the recoverable missing-input class.
    #[must_use]
    pub fn is_data_not_found(&self) -> bool {
        matches!(self, CoreError::DataNotFound { .. })
    }
}

impl From<tempfile::PersistError> for CoreError {
    fn from(err: tempfile::PersistError) -> Self {
        CoreError::Io(err.error)
    }
}

/// Result type alias for crashsift-core operations.
pub type CoreResult<T> = Result<T, CoreError>;
