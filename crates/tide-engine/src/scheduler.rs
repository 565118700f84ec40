//! Settlement scheduler.
//!
//! One task owns every runner. Due markets wait in a FIFO queue and settle
//! strictly one at a time; markets with a future round sleep in a
//! [`DelayQueue`] until just after their round closes. A heartbeat sweep
//! catches runners that somehow end up with neither a timer nor a queue
//! slot, so a dropped timer degrades into a ten-second delay instead of a
//! stuck market.

use crate::catch_up::CatchUpEngine;
use crate::clock::Clock;
use crate::metrics::MetricsHub;
use crate::reader::MarketStateReader;
use crate::runner::{MarketRunner, RunnerPhase};
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tide_core::MarketConfig;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::time::DelayQueue;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub heartbeat_interval_ms: u64,
    /// Settle this long after the round's nominal close so the on-chain
    /// clock has definitely passed it.
    pub settle_buffer_ms: u64,
    /// Wake-up delay when the next round's start time cannot be read.
    pub reschedule_retry_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: 10_000,
            settle_buffer_ms: 500,
            reschedule_retry_ms: 5_000,
        }
    }
}

pub struct Scheduler {
    engine: CatchUpEngine,
    reader: Arc<MarketStateReader>,
    hub: Arc<MetricsHub>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    runners: Vec<MarketRunner>,
    queue: VecDeque<usize>,
    timers: DelayQueue<usize>,
}

impl Scheduler {
    pub fn new(
        engine: CatchUpEngine,
        reader: Arc<MarketStateReader>,
        hub: Arc<MetricsHub>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
        markets: Vec<MarketConfig>,
    ) -> Self {
        Self {
            engine,
            reader,
            hub,
            clock,
            config,
            runners: markets.into_iter().map(MarketRunner::new).collect(),
            queue: VecDeque::new(),
            timers: DelayQueue::new(),
        }
    }

    /// Run until `shutdown` flips to true. Every market starts with an
    /// immediate catch-up pass, which settles anything that came due while
    /// the keeper was down.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(markets = self.runners.len(), "Scheduler started");
        for idx in 0..self.runners.len() {
            self.enqueue(idx);
        }
        self.publish_all();

        let period = Duration::from_millis(self.config.heartbeat_interval_ms);
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            while let Some(idx) = self.queue.pop_front() {
                if *shutdown.borrow() {
                    break;
                }
                self.settle_next(idx).await;
            }
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = shutdown.changed() => break,
                // An empty DelayQueue yields None, which disables this
                // branch until the next loop iteration.
                Some(expired) = self.timers.next() => {
                    let idx = expired.into_inner();
                    self.runners[idx].timer = None;
                    self.runners[idx].phase = RunnerPhase::Idle;
                    self.enqueue(idx);
                }
                _ = heartbeat.tick() => self.heartbeat_tick(),
            }
        }

        self.clear_pending();
        info!("Scheduler stopped");
    }

    /// Put a runner at the back of the settle queue, cancelling any pending
    /// wake-up timer. Already queued or settling runners are left alone, so
    /// double-enqueueing cannot double-settle.
    fn enqueue(&mut self, idx: usize) {
        if matches!(
            self.runners[idx].phase,
            RunnerPhase::Queued | RunnerPhase::Settling
        ) {
            return;
        }
        if let Some(key) = self.runners[idx].timer.take() {
            self.timers.try_remove(&key);
        }
        self.runners[idx].phase = RunnerPhase::Queued;
        self.queue.push_back(idx);
    }

    /// Catch one market up, fold the outcome into its metrics, and put it
    /// back on the schedule. Awaited inline by the queue drain, so at most
    /// one settlement is ever in flight.
    async fn settle_next(&mut self, idx: usize) {
        self.runners[idx].phase = RunnerPhase::Settling;
        self.publish(idx);

        let market = self.runners[idx].config.clone();
        let result = self.engine.catch_up(&market).await;
        if result.acted() {
            info!(
                market = %market.name,
                settled = result.settled_rounds,
                did_reset = result.did_reset,
                "Catch-up acted"
            );
        }

        let now = self.clock.now_ms();
        self.runners[idx].metrics.absorb(&result, now);
        self.runners[idx].phase = RunnerPhase::Idle;
        self.reschedule(idx).await;
        self.publish(idx);
    }

    /// Arm the runner's next wake-up from fresh chain state. A paused
    /// market goes straight back onto the queue for recovery; anything
    /// unreadable gets a short fixed retry instead of falling off the
    /// schedule.
    async fn reschedule(&mut self, idx: usize) {
        let market = self.runners[idx].config.clone();
        match self.reader.snapshot(&market.market_id).await {
            Ok(Some(snapshot)) if !snapshot.is_active() => {
                info!(market = %market.name, "Paused while scheduling, queueing recovery");
                self.enqueue(idx);
            }
            Ok(Some(snapshot)) => match snapshot.upcoming {
                Some(round) => {
                    let due_ms = round.start_time_ms + self.config.settle_buffer_ms;
                    let delay_ms = due_ms.saturating_sub(self.clock.now_ms());
                    debug!(
                        market = %market.name,
                        round = round.round_number,
                        delay_ms,
                        "Runner armed"
                    );
                    self.arm(idx, Duration::from_millis(delay_ms));
                }
                None => self.arm_retry(idx),
            },
            Ok(None) => self.arm_retry(idx),
            Err(err) => {
                warn!(market = %market.name, error = %err, "Reschedule read failed");
                self.arm_retry(idx);
            }
        }
    }

    fn arm(&mut self, idx: usize, delay: Duration) {
        if let Some(key) = self.runners[idx].timer.take() {
            self.timers.try_remove(&key);
        }
        let key = self.timers.insert(idx, delay);
        self.runners[idx].timer = Some(key);
        self.runners[idx].phase = RunnerPhase::Armed;
    }

    fn arm_retry(&mut self, idx: usize) {
        self.arm(idx, Duration::from_millis(self.config.reschedule_retry_ms));
    }

    /// Re-queue any runner with neither a timer nor a queue slot. This is
    /// the safety net behind every scheduling bug: the worst case becomes
    /// one heartbeat of delay.
    fn heartbeat_tick(&mut self) {
        let mut requeued = 0usize;
        for idx in 0..self.runners.len() {
            if !self.runners[idx].is_scheduled() {
                warn!(
                    market = %self.runners[idx].config.name,
                    "Runner lost its schedule, re-queueing"
                );
                self.enqueue(idx);
                requeued += 1;
            }
        }
        info!(
            markets = self.runners.len(),
            armed = self.timers.len(),
            queued = self.queue.len(),
            requeued,
            "Heartbeat"
        );
        self.publish_all();
    }

    fn clear_pending(&mut self) {
        self.queue.clear();
        self.timers.clear();
        for runner in &mut self.runners {
            runner.timer = None;
            runner.phase = RunnerPhase::Idle;
        }
        self.publish_all();
    }

    fn publish(&self, idx: usize) {
        self.hub.publish(self.runners[idx].snapshot());
    }

    fn publish_all(&self) {
        for runner in &self.runners {
            self.hub.publish(runner.snapshot());
        }
    }
}
