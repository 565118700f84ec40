//! Chain access error types.

use crate::signer::KeyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Parse(String),

    #[error("Transaction failed: {0}")]
    TxFailed(String),

    #[error("Signer error: {0}")]
    Signer(#[from] KeyError),

    #[error("No coin with sufficient balance (need {needed} MIST)")]
    InsufficientCoins { needed: u64 },
}

pub type ChainResult<T> = Result<T, ChainError>;
