//! Staleness recovery.
//!
//! One invocation looks at a market and does whichever applies: nothing
//! (not due, or nothing to settle), resume (market is paused), settle the
//! due round and keep draining until caught up, or reset (pause + resume)
//! when the round is too old for the on-chain price tolerance. Failures
//! never propagate to the caller; they are folded into the returned
//! [`CatchUpResult`].

use crate::clock::Clock;
use crate::ports::DynTxExecutor;
use crate::reader::MarketStateReader;
use crate::retry::{RetryPolicy, RetryingExecutor, SettleResult};
use std::sync::Arc;
use tide_core::{align_to_next_interval, anchor_time_sec, MarketConfig, UpcomingRound};
use tracing::{debug, info, warn};

/// What one catch-up invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatchUpResult {
    pub settled_rounds: u64,
    pub did_reset: bool,
    pub fail_count: u64,
    pub retry_count: u64,
    pub last_error: Option<String>,
}

impl CatchUpResult {
    /// True when the invocation changed on-chain state.
    #[must_use]
    pub fn acted(&self) -> bool {
        self.settled_rounds > 0 || self.did_reset
    }
}

pub struct CatchUpEngine {
    reader: Arc<MarketStateReader>,
    settler: RetryingExecutor,
    executor: DynTxExecutor,
    clock: Arc<dyn Clock>,
}

impl CatchUpEngine {
    pub fn new(
        reader: Arc<MarketStateReader>,
        executor: DynTxExecutor,
        policy: RetryPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settler: RetryingExecutor::new(executor.clone(), policy),
            reader,
            executor,
            clock,
        }
    }

    /// Bring one market up to date. Safe to call for a market that needs
    /// nothing; that is the common case when a wake-up timer fires on time.
    pub async fn catch_up(&self, market: &MarketConfig) -> CatchUpResult {
        let mut result = CatchUpResult::default();

        let snapshot = match self.reader.snapshot(&market.market_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!(market = %market.name, "Market object unreadable, nothing to do");
                return result;
            }
            Err(err) => {
                warn!(market = %market.name, error = %err, "Market read failed");
                result.last_error = Some(err.to_string());
                return result;
            }
        };
        let interval_ms = snapshot.state.interval_ms;

        // A paused market only gets resumed here; settling the fresh round
        // happens on a later invocation.
        if !snapshot.is_active() {
            info!(market = %market.name, "Market paused, resuming");
            self.resume_aligned(market, interval_ms, &mut result).await;
            return result;
        }

        let tolerance_ms = match self.reader.registry_config().await {
            Ok(Some(config)) => config.price_tolerance_ms,
            Ok(None) => {
                warn!(market = %market.name, "Registry config unreadable, skipping catch-up");
                return result;
            }
            Err(err) => {
                warn!(market = %market.name, error = %err, "Registry config read failed");
                result.last_error = Some(err.to_string());
                return result;
            }
        };

        // No upcoming round (upcoming_round == 0) means no round was ever
        // created; there is nothing to settle.
        let Some(first) = snapshot.upcoming else {
            return result;
        };

        let now = self.clock.now_ms();
        if now < first.start_time_ms {
            return result;
        }

        if now > first.start_time_ms + tolerance_ms {
            info!(
                market = %market.name,
                round = first.round_number,
                stale_ms = now - first.start_time_ms,
                tolerance_ms,
                "Round expired beyond tolerance, resetting"
            );
            self.reset(market, interval_ms, &mut result).await;
            return result;
        }

        self.drain_due_rounds(market, first, interval_ms, tolerance_ms, &mut result)
            .await;
        result
    }

    /// Settle due rounds one by one until the market is caught up. The
    /// first iteration reuses the snapshot that triggered the drain; later
    /// ones re-read because each settlement advances the upcoming round.
    async fn drain_due_rounds(
        &self,
        market: &MarketConfig,
        first: UpcomingRound,
        interval_ms: u64,
        tolerance_ms: u64,
        result: &mut CatchUpResult,
    ) {
        let mut next = Some(first);
        let mut last_settled: Option<u64> = None;

        loop {
            let round = match next.take() {
                Some(round) => round,
                None => {
                    let fresh = match self.reader.snapshot(&market.market_id).await {
                        Ok(Some(snapshot)) => snapshot,
                        Ok(None) => break,
                        Err(err) => {
                            warn!(market = %market.name, error = %err, "Re-read failed mid drain");
                            result.last_error = Some(err.to_string());
                            break;
                        }
                    };
                    let Some(fresh_round) = fresh.upcoming else {
                        break;
                    };
                    // Nodes can serve a slightly old object version right
                    // after a write; settling the same round twice would
                    // abort on-chain.
                    if last_settled.is_some_and(|n| fresh_round.round_number <= n) {
                        debug!(
                            market = %market.name,
                            round = fresh_round.round_number,
                            "Stale read after settle, stopping"
                        );
                        break;
                    }
                    fresh_round
                }
            };

            let now = self.clock.now_ms();
            if now < round.start_time_ms {
                break; // caught up
            }
            if now > round.start_time_ms + tolerance_ms {
                info!(
                    market = %market.name,
                    round = round.round_number,
                    "Round crossed tolerance during catch-up, resetting"
                );
                self.reset(market, interval_ms, result).await;
                break;
            }

            match self
                .settler
                .settle(market, anchor_time_sec(round.start_time_ms))
                .await
            {
                SettleResult::Settled { digest, retries } => {
                    result.settled_rounds += 1;
                    result.retry_count += u64::from(retries);
                    last_settled = Some(round.round_number);
                    info!(
                        market = %market.name,
                        round = round.round_number,
                        %digest,
                        "Round settled"
                    );
                }
                SettleResult::Exhausted { retries, error } => {
                    result.retry_count += u64::from(retries);
                    result.fail_count += 1;
                    result.last_error = Some(error);
                    break;
                }
            }
        }
    }

    /// Skip the unsettleable round: pause, then resume with an aligned
    /// start. A failure at either step records one failure and leaves
    /// `did_reset` unset.
    async fn reset(&self, market: &MarketConfig, interval_ms: u64, result: &mut CatchUpResult) {
        if let Err(err) = self.executor.pause(market).await {
            warn!(market = %market.name, error = %err, "Pause failed, reset abandoned");
            result.fail_count += 1;
            result.last_error = Some(err.to_string());
            return;
        }
        self.resume_aligned(market, interval_ms, result).await;
    }

    /// Resume with the next aligned start time. Sets `did_reset` on
    /// success.
    async fn resume_aligned(
        &self,
        market: &MarketConfig,
        interval_ms: u64,
        result: &mut CatchUpResult,
    ) {
        let start_time_ms = align_to_next_interval(self.clock.now_ms(), interval_ms);
        match self.executor.resume(market, start_time_ms).await {
            Ok(digest) => {
                result.did_reset = true;
                info!(market = %market.name, start_time_ms, %digest, "Market resumed");
            }
            Err(err) => {
                warn!(market = %market.name, error = %err, "Resume failed");
                result.fail_count += 1;
                result.last_error = Some(err.to_string());
            }
        }
    }
}
