//! Chain-facing read layer.
//!
//! Snapshots always hit the chain; the registry config is cached for a
//! short TTL because every catch-up invocation needs it and it changes
//! rarely. Entries age out, nothing invalidates them explicitly.

use crate::clock::Clock;
use crate::error::EngineResult;
use crate::ports::DynChainReader;
use std::sync::Arc;
use tide_core::{MarketSnapshot, RegistryConfig};

#[derive(Debug, Clone, Copy)]
struct CachedConfig {
    config: RegistryConfig,
    fetched_at_ms: u64,
}

pub struct MarketStateReader {
    chain: DynChainReader,
    clock: Arc<dyn Clock>,
    registry_id: String,
    cache_ttl_ms: u64,
    cached: parking_lot::Mutex<Option<CachedConfig>>,
}

impl MarketStateReader {
    pub fn new(
        chain: DynChainReader,
        clock: Arc<dyn Clock>,
        registry_id: impl Into<String>,
        cache_ttl_ms: u64,
    ) -> Self {
        Self {
            chain,
            clock,
            registry_id: registry_id.into(),
            cache_ttl_ms,
            cached: parking_lot::Mutex::new(None),
        }
    }

    /// Fresh market view straight from the chain.
    pub async fn snapshot(&self, market_id: &str) -> EngineResult<Option<MarketSnapshot>> {
        self.chain.market_snapshot(market_id).await
    }

    /// Registry settlement parameters, cached. A hit issues no chain read.
    /// Only successful reads are cached; errors propagate and an unreadable
    /// config is returned as `None` every time.
    pub async fn registry_config(&self) -> EngineResult<Option<RegistryConfig>> {
        let now = self.clock.now_ms();
        if let Some(entry) = *self.cached.lock() {
            if now.saturating_sub(entry.fetched_at_ms) < self.cache_ttl_ms {
                return Ok(Some(entry.config));
            }
        }

        let fresh = self.chain.registry_config(&self.registry_id).await?;
        if let Some(config) = fresh {
            *self.cached.lock() = Some(CachedConfig {
                config,
                fetched_at_ms: now,
            });
        }
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::EngineError;
    use crate::ports::MockChainReader;

    const TTL_MS: u64 = 10_000;

    fn config(tolerance_ms: u64) -> RegistryConfig {
        RegistryConfig {
            fee_bps: 300,
            settler_reward_bps: 100,
            price_tolerance_ms: tolerance_ms,
        }
    }

    fn reader_with(
        mock: Arc<MockChainReader>,
        clock: Arc<ManualClock>,
    ) -> MarketStateReader {
        MarketStateReader::new(mock, clock, "0xreg", TTL_MS)
    }

    #[tokio::test]
    async fn config_is_cached_within_the_ttl() {
        let mock = Arc::new(MockChainReader::new());
        mock.set_config(Ok(Some(config(60_000))));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let reader = reader_with(mock.clone(), clock.clone());

        assert_eq!(reader.registry_config().await.unwrap(), Some(config(60_000)));
        clock.advance(TTL_MS - 1);
        assert_eq!(reader.registry_config().await.unwrap(), Some(config(60_000)));

        assert_eq!(mock.config_reads(), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let mock = Arc::new(MockChainReader::new());
        mock.set_config(Ok(Some(config(60_000))));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let reader = reader_with(mock.clone(), clock.clone());

        reader.registry_config().await.unwrap();
        clock.advance(TTL_MS);

        mock.set_config(Ok(Some(config(90_000))));
        assert_eq!(reader.registry_config().await.unwrap(), Some(config(90_000)));
        assert_eq!(mock.config_reads(), 2);
    }

    #[tokio::test]
    async fn unreadable_config_is_not_cached() {
        let mock = Arc::new(MockChainReader::new());
        mock.set_config(Ok(None));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let reader = reader_with(mock.clone(), clock.clone());

        assert_eq!(reader.registry_config().await.unwrap(), None);
        assert_eq!(reader.registry_config().await.unwrap(), None);
        assert_eq!(mock.config_reads(), 2);

        // Errors propagate without poisoning the cache.
        mock.set_config(Err(EngineError::Read("down".into())));
        assert!(reader.registry_config().await.is_err());
        mock.set_config(Ok(Some(config(60_000))));
        assert_eq!(reader.registry_config().await.unwrap(), Some(config(60_000)));
    }
}
