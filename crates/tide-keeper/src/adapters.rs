//! Engine port implementations backed by the fullnode and Hermes.
//!
//! The scheduler and catch-up engine only know the reader/executor traits;
//! these adapters translate to the real clients and fold transport errors
//! into the engine's error strings.

use std::sync::Arc;

use tide_chain::{SuiClient, TxBuilder};
use tide_core::{MarketConfig, MarketSnapshot, RegistryConfig};
use tide_engine::{BoxFuture, ChainReader, EngineError, EngineResult, TxExecutor};
use tide_oracle::HermesClient;

pub struct ChainAdapter {
    client: Arc<SuiClient>,
}

impl ChainAdapter {
    pub fn new(client: Arc<SuiClient>) -> Self {
        Self { client }
    }
}

impl ChainReader for ChainAdapter {
    fn market_snapshot<'a>(
        &'a self,
        market_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Option<MarketSnapshot>>> {
        Box::pin(async move {
            self.client
                .market_snapshot(market_id)
                .await
                .map_err(read_error)
        })
    }

    fn registry_config<'a>(
        &'a self,
        registry_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Option<RegistryConfig>>> {
        Box::pin(async move {
            self.client
                .registry_config(registry_id)
                .await
                .map_err(read_error)
        })
    }
}

/// Submits settlements as oracle-refresh-plus-settle transactions; pause and
/// resume go straight to the admin entry points.
pub struct ExecutorAdapter {
    client: Arc<SuiClient>,
    builder: TxBuilder,
    oracle: HermesClient,
}

impl ExecutorAdapter {
    pub fn new(client: Arc<SuiClient>, builder: TxBuilder, oracle: HermesClient) -> Self {
        Self {
            client,
            builder,
            oracle,
        }
    }
}

impl TxExecutor for ExecutorAdapter {
    fn settle<'a>(
        &'a self,
        market: &'a MarketConfig,
        anchor_time_sec: u64,
    ) -> BoxFuture<'a, EngineResult<String>> {
        Box::pin(async move {
            // Markets addressed by raw object id have no feed configured
            // and cannot be settled.
            if market.feed_id.is_empty() || market.price_info_object_id.is_empty() {
                return Err(EngineError::Tx(format!(
                    "market {} has no oracle feed configured",
                    market.name
                )));
            }
            let updates = self
                .oracle
                .update_at(anchor_time_sec, std::slice::from_ref(&market.feed_id))
                .await
                .map_err(tx_error)?;
            let plan = self.builder.settle_and_advance(
                &market.market_id,
                &market.price_info_object_id,
                &updates,
            );
            self.client.execute_plan(&plan).await.map_err(tx_error)
        })
    }

    fn pause<'a>(&'a self, market: &'a MarketConfig) -> BoxFuture<'a, EngineResult<String>> {
        Box::pin(async move {
            let plan = self.builder.pause_market(&market.market_id);
            self.client.execute_plan(&plan).await.map_err(tx_error)
        })
    }

    fn resume<'a>(
        &'a self,
        market: &'a MarketConfig,
        start_time_ms: u64,
    ) -> BoxFuture<'a, EngineResult<String>> {
        Box::pin(async move {
            let plan = self.builder.resume_market(&market.market_id, start_time_ms);
            self.client.execute_plan(&plan).await.map_err(tx_error)
        })
    }
}

fn read_error(err: impl std::fmt::Display) -> EngineError {
    EngineError::Read(err.to_string())
}

fn tx_error(err: impl std::fmt::Display) -> EngineError {
    EngineError::Tx(err.to_string())
}
