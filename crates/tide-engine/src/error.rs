//! Engine error types.

use thiserror::Error;

/// Failures surfaced by the chain ports. Stringly typed on purpose: the
/// engine only routes errors into retry decisions, metrics, and logs, it
/// never matches on transport detail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Chain read failed: {0}")]
    Read(String),

    #[error("Transaction failed: {0}")]
    Tx(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
