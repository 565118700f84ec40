//! Market, round, and registry projections.
//!
//! These are read-only views of on-chain objects, constructed fresh on every
//! read and never mutated. Raw status/result codes follow the ledger
//! program's encoding; helpers decode them into enums where the code set is
//! closed.

use crate::error::{CoreError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market lifecycle status.
///
/// On-chain encoding: 0 = active. Every other value means the market is not
/// creating rounds and must be resumed before settlement can continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketStatus {
    Active,
    Paused,
}

impl MarketStatus {
    #[must_use]
    pub fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            Self::Active
        } else {
            Self::Paused
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Paused => write!(f, "PAUSED"),
        }
    }
}

/// Round lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Upcoming,
    Live,
    Settled,
    Cancelled,
}

impl RoundStatus {
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Upcoming),
            1 => Some(Self::Live),
            2 => Some(Self::Settled),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Tickets in a round can only be redeemed once the round reached a
    /// terminal state.
    #[must_use]
    pub fn is_redeemable(&self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

impl fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upcoming => write!(f, "UPCOMING"),
            Self::Live => write!(f, "LIVE"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Settled round outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResult {
    Up,
    Down,
    Draw,
}

impl RoundResult {
    #[must_use]
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Up),
            1 => Some(Self::Down),
            2 => Some(Self::Draw),
            _ => None,
        }
    }
}

impl fmt::Display for RoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Draw => write!(f, "DRAW"),
        }
    }
}

/// Market object projection: status, round pointers, and the id of the
/// dynamic-field table holding the rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketState {
    pub status: MarketStatus,
    pub current_round: u64,
    pub upcoming_round: u64,
    pub round_count: u64,
    /// Fixed round duration. Always > 0 for a well-formed market.
    pub interval_ms: u64,
    pub rounds_table_id: String,
}

/// Start-time info for the round the market will settle next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcomingRound {
    pub round_number: u64,
    pub start_time_ms: u64,
}

/// Point-in-time view of a market: the market object plus, when the market
/// is active and has an upcoming round, that round's start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub state: MarketState,
    pub upcoming: Option<UpcomingRound>,
}

impl MarketSnapshot {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.status.is_active()
    }
}

/// Registry-wide settlement parameters.
///
/// `price_tolerance_ms` bounds how long after a round's start time a
/// settlement is still accepted on-chain; beyond it the round can only be
/// skipped via pause + resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    pub fee_bps: u64,
    pub settler_reward_bps: u64,
    pub price_tolerance_ms: u64,
}

/// Oracle price as stored on-chain: integer magnitude with a positive
/// decimal exponent (value = magnitude * 10^-expo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub magnitude: u64,
    pub expo: u32,
}

impl PriceQuote {
    /// Decimal value of the quote. Exponents beyond Decimal's scale range
    /// are clamped; on-chain feeds use single-digit exponents.
    #[must_use]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.magnitude), self.expo.min(28))
    }
}

impl fmt::Display for PriceQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

/// Full round row from the market's rounds table.
#[derive(Debug, Clone)]
pub struct RoundData {
    pub round_number: u64,
    /// Raw status code; decode with [`RoundStatus::from_raw`].
    pub status: u8,
    pub start_time_ms: u64,
    pub open_price: Option<PriceQuote>,
    pub close_price: Option<PriceQuote>,
    pub open_timestamp_ms: Option<u64>,
    pub close_timestamp_ms: Option<u64>,
    pub up_amount: u64,
    pub down_amount: u64,
    pub up_count: u64,
    pub down_count: u64,
    pub pool_value: u64,
    pub prize_pool: u64,
    /// Raw result code; decode with [`RoundResult::from_raw`].
    pub result: Option<u8>,
}

impl RoundData {
    #[must_use]
    pub fn total_bet_amount(&self) -> u64 {
        self.up_amount.saturating_add(self.down_amount)
    }
}

/// Owned bet receipt.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub object_id: String,
    pub market_id: String,
    pub round_number: u64,
    /// 0 = up, 1 = down.
    pub direction: u8,
    pub amount: u64,
}

/// Keeper-side market entry: what to call the market and which on-chain
/// objects drive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Display name (e.g. "SUI_1M").
    pub name: String,
    /// Shared Market object id.
    pub market_id: String,
    /// Oracle price feed id (hex with 0x).
    pub feed_id: String,
    /// Shared price-info object the oracle update call refreshes for this
    /// feed. Stable per feed, so configured rather than discovered.
    pub price_info_object_id: String,
}

impl MarketConfig {
    /// Validate that all fields are present and object ids look like object
    /// ids. Called once at startup.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::InvalidConfig("market name is empty".into()));
        }
        for (label, id) in [
            ("market_id", &self.market_id),
            ("feed_id", &self.feed_id),
            ("price_info_object_id", &self.price_info_object_id),
        ] {
            if !id.starts_with("0x") || id.len() < 3 {
                return Err(CoreError::InvalidObjectId(format!(
                    "{}: {} for market {}",
                    label, id, self.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_config() -> MarketConfig {
        MarketConfig {
            name: "SUI_1M".to_string(),
            market_id: "0x1120".to_string(),
            feed_id: "0x50c6".to_string(),
            price_info_object_id: "0xaaaa".to_string(),
        }
    }

    #[test]
    fn market_status_from_raw() {
        assert_eq!(MarketStatus::from_raw(0), MarketStatus::Active);
        assert_eq!(MarketStatus::from_raw(1), MarketStatus::Paused);
        // Any unknown code is treated as not-active.
        assert_eq!(MarketStatus::from_raw(7), MarketStatus::Paused);
    }

    #[test]
    fn round_status_from_raw() {
        assert_eq!(RoundStatus::from_raw(2), Some(RoundStatus::Settled));
        assert_eq!(RoundStatus::from_raw(9), None);
        assert!(RoundStatus::Settled.is_redeemable());
        assert!(RoundStatus::Cancelled.is_redeemable());
        assert!(!RoundStatus::Live.is_redeemable());
    }

    #[test]
    fn price_quote_decimal() {
        let quote = PriceQuote {
            magnitude: 352_419_000,
            expo: 8,
        };
        assert_eq!(quote.to_decimal(), dec!(3.52419000));
        assert_eq!(quote.to_string(), "3.52419000");
    }

    #[test]
    fn market_config_validation() {
        assert!(sample_config().validate().is_ok());

        let mut bad = sample_config();
        bad.market_id = "1120".to_string();
        assert!(bad.validate().is_err());

        let mut empty = sample_config();
        empty.name.clear();
        assert!(empty.validate().is_err());
    }
}
