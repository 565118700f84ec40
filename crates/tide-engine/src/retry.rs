//! Bounded retry wrapper around settlement submission.
//!
//! One settle request becomes up to `1 + max_retries` attempts with
//! exponential backoff between them (base, 2x base, 4x base, no jitter).
//! Exhaustion is an outcome, not an error: the caller folds it into
//! metrics and decides whether to keep draining rounds.

use crate::error::EngineError;
use crate::ports::DynTxExecutor;
use std::time::Duration;
use tide_core::MarketConfig;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff after the 0-based `failed_attempt` failed: base * 2^attempt.
    #[must_use]
    pub fn backoff_delay(&self, failed_attempt: u32) -> Duration {
        let factor = 1u64 << failed_attempt.min(20);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Outcome of one settle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleResult {
    /// Submitted and confirmed; `retries` failed attempts preceded it.
    Settled { digest: String, retries: u32 },
    /// Every attempt failed; `error` is the last failure.
    Exhausted { retries: u32, error: String },
}

impl SettleResult {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Settled { .. })
    }

    #[must_use]
    pub fn retries(&self) -> u32 {
        match self {
            Self::Settled { retries, .. } | Self::Exhausted { retries, .. } => *retries,
        }
    }
}

pub struct RetryingExecutor {
    executor: DynTxExecutor,
    policy: RetryPolicy,
}

impl RetryingExecutor {
    pub fn new(executor: DynTxExecutor, policy: RetryPolicy) -> Self {
        Self { executor, policy }
    }

    /// Submit one settlement, retrying transient failures with backoff.
    /// Never returns an error; exhaustion is reported in the result.
    pub async fn settle(&self, market: &MarketConfig, anchor_time_sec: u64) -> SettleResult {
        let mut attempt: u32 = 0;
        let mut retries: u32 = 0;

        loop {
            match self.executor.settle(market, anchor_time_sec).await {
                Ok(digest) => return SettleResult::Settled { digest, retries },
                Err(EngineError::Read(msg)) | Err(EngineError::Tx(msg)) => {
                    if attempt >= self.policy.max_retries {
                        error!(
                            market = %market.name,
                            attempts = attempt + 1,
                            error = %msg,
                            "Settle failed, retries exhausted"
                        );
                        return SettleResult::Exhausted {
                            retries,
                            error: msg,
                        };
                    }
                    let delay = self.policy.backoff_delay(attempt);
                    warn!(
                        market = %market.name,
                        attempt = attempt + 1,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %msg,
                        "Settle attempt failed, retrying"
                    );
                    retries += 1;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockTxExecutor, TxOp};
    use std::sync::Arc;

    fn market() -> MarketConfig {
        MarketConfig {
            name: "SUI_1M".to_string(),
            market_id: "0xmarket".to_string(),
            feed_id: "0xfeed".to_string(),
            price_info_object_id: "0xinfo".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_per_failed_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(2_000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(4_000));
    }

    #[tokio::test(start_paused = true)]
    async fn first_try_success_sleeps_nowhere() {
        let executor = Arc::new(MockTxExecutor::new());
        let retrying = RetryingExecutor::new(executor.clone(), RetryPolicy::default());

        let started = tokio::time::Instant::now();
        let result = retrying.settle(&market(), 1_700_000_000).await;

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert!(matches!(result, SettleResult::Settled { retries: 0, .. }));
        assert_eq!(executor.ops().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn two_failures_back_off_then_succeed() {
        let executor = Arc::new(MockTxExecutor::new());
        executor.push_settle_result(Err(EngineError::Tx("congested".into())));
        executor.push_settle_result(Err(EngineError::Tx("congested".into())));
        let retrying = RetryingExecutor::new(executor.clone(), RetryPolicy::default());

        let started = tokio::time::Instant::now();
        let result = retrying.settle(&market(), 1_700_000_000).await;

        // 1000ms after the first failure, 2000ms after the second.
        assert_eq!(started.elapsed(), Duration::from_millis(3_000));
        assert!(matches!(result, SettleResult::Settled { retries: 2, .. }));
        assert_eq!(executor.ops().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhaustion_reports_the_last_error() {
        let executor = Arc::new(MockTxExecutor::new());
        for i in 0..4 {
            executor.push_settle_result(Err(EngineError::Tx(format!("failure {i}"))));
        }
        let retrying = RetryingExecutor::new(executor.clone(), RetryPolicy::default());

        let result = retrying.settle(&market(), 1_700_000_000).await;

        assert_eq!(
            result,
            SettleResult::Exhausted {
                retries: 3,
                error: "failure 3".to_string()
            }
        );
        // Initial attempt plus three retries, all against the same anchor.
        let ops = executor.ops();
        assert_eq!(ops.len(), 4);
        assert!(ops
            .iter()
            .all(|op| matches!(op, TxOp::Settle { anchor_time_sec: 1_700_000_000, .. })));
    }
}
