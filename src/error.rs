//! Error types for typedcache
//!
//! Provides a unified error type for all client operations.

use thiserror::Error;

use crate::driver::ReturnCode;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for typedcache operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Driver Errors
    // -------------------------------------------------------------------------
    #[error("Driver error ({code:?}): {message}")]
    Driver { code: ReturnCode, message: String },

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Usage Errors
    // -------------------------------------------------------------------------
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// Driver return code carried by this error, if it came from the driver
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            CacheError::Driver { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// True when the driver reported the key as absent
    pub fn is_not_found(&self) -> bool {
        self.return_code() == Some(ReturnCode::NotFound)
    }

    /// True when the driver refused a conditional store
    pub fn is_not_stored(&self) -> bool {
        self.return_code() == Some(ReturnCode::NotStored)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Decode(err.to_string())
    }
}
