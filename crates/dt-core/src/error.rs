//! Error types for the ditau toolkit

use thiserror::Error;

/// Toolkit-wide error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error (bad configuration or malformed input data)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error (numerical failure during a fit)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Result-cache persistence error. Always fatal for the sample's run:
    /// a half-written cache file cannot be recovered by a rerun.
    #[error("Cache error: {0}")]
    Cache(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
