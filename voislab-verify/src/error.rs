//! Error types for voislab-verify
//!
//! Fatal setup errors (unreachable table or bucket, bad configuration)
//! surface as `VerifyError`. Per-record findings are data, not errors, and
//! never travel through this type.

use thiserror::Error;

/// Verification error type
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Metadata table could not be read or written
    #[error("Metadata store error: {0}")]
    MetadataStore(String),

    /// Media bucket could not be listed or read
    #[error("Media store error: {0}")]
    MediaStore(String),

    /// Stored item could not be interpreted as a track record
    #[error("Invalid record: {0}")]
    Record(String),

    /// User input could not be read
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerifyError>;
