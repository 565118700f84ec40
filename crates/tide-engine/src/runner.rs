//! Per-market runner state.
//!
//! A runner is the scheduler's bookkeeping for one configured market: which
//! phase of the settle cycle it is in, whether a wake-up timer is pending,
//! and the lifetime counters exported over the metrics endpoint.

use crate::catch_up::CatchUpResult;
use std::fmt;
use tide_core::MarketConfig;
use tokio_util::time::delay_queue;

/// Where a runner sits in the settle cycle.
///
/// `Idle` is transient: runners pass through it between finishing a
/// settlement and being re-armed or re-queued. A runner observed idle with
/// no timer outside that window has fallen off the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Idle,
    Armed,
    Queued,
    Settling,
}

impl fmt::Display for RunnerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Queued => "queued",
            Self::Settling => "settling",
        };
        f.write_str(name)
    }
}

/// Lifetime counters for one market, accumulated across catch-up runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunnerMetrics {
    pub settle_count: u64,
    pub fail_count: u64,
    pub retry_count: u64,
    pub last_settle_time_ms: Option<u64>,
    pub last_error: Option<String>,
}

impl RunnerMetrics {
    /// Fold one catch-up outcome into the counters. `last_error` is sticky:
    /// a clean run leaves the previous error visible until the next one
    /// replaces it.
    pub fn absorb(&mut self, result: &CatchUpResult, now_ms: u64) {
        self.settle_count += result.settled_rounds;
        self.fail_count += result.fail_count;
        self.retry_count += result.retry_count;
        if result.settled_rounds > 0 {
            self.last_settle_time_ms = Some(now_ms);
        }
        if let Some(error) = &result.last_error {
            self.last_error = Some(error.clone());
        }
    }
}

/// One market's scheduling state. Owned and mutated only by the scheduler
/// task; everyone else sees [`RunnerSnapshot`]s.
#[derive(Debug)]
pub struct MarketRunner {
    pub config: MarketConfig,
    pub phase: RunnerPhase,
    pub timer: Option<delay_queue::Key>,
    pub metrics: RunnerMetrics,
}

impl MarketRunner {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            config,
            phase: RunnerPhase::Idle,
            timer: None,
            metrics: RunnerMetrics::default(),
        }
    }

    /// True when the runner will make progress without help: a wake-up
    /// timer is pending, it is waiting in the queue, or it is settling
    /// right now.
    pub fn is_scheduled(&self) -> bool {
        self.timer.is_some() || matches!(self.phase, RunnerPhase::Queued | RunnerPhase::Settling)
    }

    pub fn snapshot(&self) -> RunnerSnapshot {
        RunnerSnapshot {
            name: self.config.name.clone(),
            settling: self.phase == RunnerPhase::Settling,
            scheduled: self.timer.is_some(),
            metrics: self.metrics.clone(),
        }
    }
}

/// Read-only copy of a runner's state, published to the metrics hub.
#[derive(Debug, Clone)]
pub struct RunnerSnapshot {
    pub name: String,
    pub settling: bool,
    pub scheduled: bool,
    pub metrics: RunnerMetrics,
}
