//! Oracle error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Hermes returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("No update data returned for feeds: {0}")]
    EmptyUpdate(String),

    #[error("Malformed update payload: {0}")]
    Payload(String),
}

pub type OracleResult<T> = Result<T, OracleError>;
