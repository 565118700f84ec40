//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market error: {0}")]
    Market(String),

    #[error("Core error: {0}")]
    Core(#[from] tide_core::CoreError),

    #[error("Chain error: {0}")]
    Chain(#[from] tide_chain::ChainError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] tide_oracle::OracleError),

    #[error("Signer error: {0}")]
    Key(#[from] tide_chain::KeyError),
}

pub type AppResult<T> = Result<T, AppError>;
