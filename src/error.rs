//! Error handling and custom error types
//!
//! Provides unified error handling across the pipeline using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid upload: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, Error>;
