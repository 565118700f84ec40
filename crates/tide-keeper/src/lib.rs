//! Tide keeper binary internals.
//!
//! The daemon (`run`) wires the settlement engine to the Sui and Hermes
//! clients and supervises it; every other subcommand is a one-shot
//! operation over the same clients:
//! - Configuration loading and market-name resolution
//! - Engine port adapters over the fullnode client
//! - The daemon application with graceful shutdown
//! - Operator commands (settle, admin, bet/redeem, inspection)

pub mod adapters;
pub mod app;
pub mod commands;
pub mod config;
pub mod error;

pub use app::Application;
pub use commands::Ops;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
