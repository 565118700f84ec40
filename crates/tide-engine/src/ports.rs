//! Ports to the ledger: chain reads and transaction submission.
//!
//! Both traits are dyn-compatible (boxed futures) so the scheduler holds
//! trait objects and tests script them without a network. The mocks live
//! here, next to the traits, and are exported for downstream tests.

use crate::error::EngineResult;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tide_core::{MarketConfig, MarketSnapshot, RegistryConfig};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Read-only chain access.
pub trait ChainReader: Send + Sync {
    /// Point-in-time market view. `None` when the market object is missing
    /// or unparseable; upcoming-round info is included only for an active
    /// market with a pending round.
    fn market_snapshot<'a>(
        &'a self,
        market_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Option<MarketSnapshot>>>;

    /// Registry-wide settlement parameters.
    fn registry_config<'a>(
        &'a self,
        registry_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Option<RegistryConfig>>>;
}

/// Transaction submission. Implementations return the confirmed digest;
/// a transaction that executed but failed on-chain is an `Err`.
pub trait TxExecutor: Send + Sync {
    /// Settle the market's due round with the oracle price at
    /// `anchor_time_sec`, advancing the market to the next round.
    fn settle<'a>(
        &'a self,
        market: &'a MarketConfig,
        anchor_time_sec: u64,
    ) -> BoxFuture<'a, EngineResult<String>>;

    /// Pause round progression.
    fn pause<'a>(&'a self, market: &'a MarketConfig) -> BoxFuture<'a, EngineResult<String>>;

    /// Resume a paused market with a fresh round at `start_time_ms`.
    fn resume<'a>(
        &'a self,
        market: &'a MarketConfig,
        start_time_ms: u64,
    ) -> BoxFuture<'a, EngineResult<String>>;
}

pub type DynChainReader = Arc<dyn ChainReader>;
pub type DynTxExecutor = Arc<dyn TxExecutor>;

/// Scripted chain reader for tests.
///
/// Per-market snapshot queues are consumed in order; once a queue is empty
/// the market's fallback snapshot (if any) answers every further read.
#[derive(Default)]
pub struct MockChainReader {
    queues: parking_lot::Mutex<HashMap<String, VecDeque<EngineResult<Option<MarketSnapshot>>>>>,
    fallbacks: parking_lot::Mutex<HashMap<String, EngineResult<Option<MarketSnapshot>>>>,
    config: parking_lot::Mutex<Option<EngineResult<Option<RegistryConfig>>>>,
    snapshot_reads: AtomicU64,
    config_reads: AtomicU64,
}

impl MockChainReader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one snapshot response for the market.
    pub fn push_snapshot(&self, market_id: &str, result: EngineResult<Option<MarketSnapshot>>) {
        self.queues
            .lock()
            .entry(market_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Steady-state response once the queue for the market is drained.
    pub fn set_fallback(&self, market_id: &str, result: EngineResult<Option<MarketSnapshot>>) {
        self.fallbacks.lock().insert(market_id.to_string(), result);
    }

    pub fn set_config(&self, result: EngineResult<Option<RegistryConfig>>) {
        *self.config.lock() = Some(result);
    }

    pub fn snapshot_reads(&self) -> u64 {
        self.snapshot_reads.load(Ordering::SeqCst)
    }

    pub fn config_reads(&self) -> u64 {
        self.config_reads.load(Ordering::SeqCst)
    }
}

impl ChainReader for MockChainReader {
    fn market_snapshot<'a>(
        &'a self,
        market_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Option<MarketSnapshot>>> {
        Box::pin(async move {
            self.snapshot_reads.fetch_add(1, Ordering::SeqCst);
            if let Some(result) = self
                .queues
                .lock()
                .get_mut(market_id)
                .and_then(VecDeque::pop_front)
            {
                return result;
            }
            self.fallbacks
                .lock()
                .get(market_id)
                .cloned()
                .unwrap_or(Ok(None))
        })
    }

    fn registry_config<'a>(
        &'a self,
        _registry_id: &'a str,
    ) -> BoxFuture<'a, EngineResult<Option<RegistryConfig>>> {
        Box::pin(async move {
            self.config_reads.fetch_add(1, Ordering::SeqCst);
            self.config.lock().clone().unwrap_or(Ok(None))
        })
    }
}

/// Operation recorded by [`MockTxExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOp {
    Settle { market: String, anchor_time_sec: u64 },
    Pause { market: String },
    Resume { market: String, start_time_ms: u64 },
}

/// Recording transaction executor for tests.
///
/// Settle results are consumed from a queue (empty queue means success);
/// pause and resume each return one configurable result. Every submission
/// is recorded, and settle calls note their start/end instants so tests can
/// assert serialization.
pub struct MockTxExecutor {
    ops: parking_lot::Mutex<Vec<TxOp>>,
    settle_results: parking_lot::Mutex<VecDeque<EngineResult<String>>>,
    pause_result: parking_lot::Mutex<EngineResult<String>>,
    resume_result: parking_lot::Mutex<EngineResult<String>>,
    settle_delay_ms: AtomicU64,
    settle_windows: parking_lot::Mutex<Vec<(tokio::time::Instant, tokio::time::Instant)>>,
}

impl Default for MockTxExecutor {
    fn default() -> Self {
        Self {
            ops: parking_lot::Mutex::new(Vec::new()),
            settle_results: parking_lot::Mutex::new(VecDeque::new()),
            pause_result: parking_lot::Mutex::new(Ok("pause-digest".to_string())),
            resume_result: parking_lot::Mutex::new(Ok("resume-digest".to_string())),
            settle_delay_ms: AtomicU64::new(0),
            settle_windows: parking_lot::Mutex::new(Vec::new()),
        }
    }
}

impl MockTxExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_settle_result(&self, result: EngineResult<String>) {
        self.settle_results.lock().push_back(result);
    }

    pub fn set_pause_result(&self, result: EngineResult<String>) {
        *self.pause_result.lock() = result;
    }

    pub fn set_resume_result(&self, result: EngineResult<String>) {
        *self.resume_result.lock() = result;
    }

    /// Make each settle call take this long (tokio virtual time).
    pub fn set_settle_delay_ms(&self, delay_ms: u64) {
        self.settle_delay_ms.store(delay_ms, Ordering::SeqCst);
    }

    pub fn ops(&self) -> Vec<TxOp> {
        self.ops.lock().clone()
    }

    pub fn settle_windows(&self) -> Vec<(tokio::time::Instant, tokio::time::Instant)> {
        self.settle_windows.lock().clone()
    }
}

impl TxExecutor for MockTxExecutor {
    fn settle<'a>(
        &'a self,
        market: &'a MarketConfig,
        anchor_time_sec: u64,
    ) -> BoxFuture<'a, EngineResult<String>> {
        Box::pin(async move {
            self.ops.lock().push(TxOp::Settle {
                market: market.name.clone(),
                anchor_time_sec,
            });

            let started = tokio::time::Instant::now();
            let delay = self.settle_delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
            }
            self.settle_windows
                .lock()
                .push((started, tokio::time::Instant::now()));

            self.settle_results
                .lock()
                .pop_front()
                .unwrap_or(Ok("settle-digest".to_string()))
        })
    }

    fn pause<'a>(&'a self, market: &'a MarketConfig) -> BoxFuture<'a, EngineResult<String>> {
        Box::pin(async move {
            self.ops.lock().push(TxOp::Pause {
                market: market.name.clone(),
            });
            self.pause_result.lock().clone()
        })
    }

    fn resume<'a>(
        &'a self,
        market: &'a MarketConfig,
        start_time_ms: u64,
    ) -> BoxFuture<'a, EngineResult<String>> {
        Box::pin(async move {
            self.ops.lock().push(TxOp::Resume {
                market: market.name.clone(),
                start_time_ms,
            });
            self.resume_result.lock().clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn market(name: &str) -> MarketConfig {
        MarketConfig {
            name: name.to_string(),
            market_id: format!("0x{name}"),
            feed_id: "0xfeed".to_string(),
            price_info_object_id: "0xinfo".to_string(),
        }
    }

    #[tokio::test]
    async fn mock_reader_drains_queue_then_falls_back() {
        let reader = MockChainReader::new();
        reader.push_snapshot("0xa", Err(EngineError::Read("boom".into())));
        reader.set_fallback("0xa", Ok(None));

        assert_eq!(
            reader.market_snapshot("0xa").await,
            Err(EngineError::Read("boom".into()))
        );
        assert_eq!(reader.market_snapshot("0xa").await, Ok(None));
        assert_eq!(reader.snapshot_reads(), 2);
    }

    #[tokio::test]
    async fn mock_executor_records_ops_in_order() {
        let executor = MockTxExecutor::new();
        executor.push_settle_result(Err(EngineError::Tx("rejected".into())));

        let m = market("SUI_1M");
        assert!(executor.settle(&m, 1_700_000_000).await.is_err());
        assert!(executor.settle(&m, 1_700_000_060).await.is_ok());
        executor.pause(&m).await.unwrap();

        assert_eq!(
            executor.ops(),
            vec![
                TxOp::Settle { market: "SUI_1M".into(), anchor_time_sec: 1_700_000_000 },
                TxOp::Settle { market: "SUI_1M".into(), anchor_time_sec: 1_700_000_060 },
                TxOp::Pause { market: "SUI_1M".into() },
            ]
        );
    }
}
