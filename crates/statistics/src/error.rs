//! Statistics error types.

use domain::DirectoryError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while building a statistics report.
#[derive(Debug, Error)]
pub enum StatisticsError {
    /// The requested window is malformed.
    #[error("Invalid statistics window: {0}")]
    Validation(String),

    /// An error occurred in the order store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The user directory could not be queried.
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Result type for statistics operations.
pub type Result<T> = std::result::Result<T, StatisticsError>;
