//! Error types for tide-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid market config: {0}")]
    InvalidConfig(String),

    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
