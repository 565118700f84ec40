//! Core domain types for the Tide settlement keeper.
//!
//! This crate provides the fundamental types shared across the system:
//! - `MarketState`, `MarketSnapshot`: on-chain market projections
//! - `RegistryConfig`: registry-wide settlement parameters
//! - `RoundData`, `Ticket`: round and bet-receipt projections
//! - `MarketConfig`: keeper-side market entry (name, object ids, feed)
//! - Round-boundary time math (`align_to_next_interval`)

pub mod error;
pub mod market;
pub mod timing;

pub use error::{CoreError, Result};
pub use market::{
    MarketConfig, MarketSnapshot, MarketState, MarketStatus, PriceQuote, RegistryConfig,
    RoundData, RoundResult, RoundStatus, Ticket, UpcomingRound,
};
pub use timing::{align_to_next_interval, anchor_time_sec, START_TIME_BUFFER_MS};
