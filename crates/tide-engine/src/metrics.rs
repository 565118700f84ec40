//! Shared runner-state hub.
//!
//! The scheduler publishes [`RunnerSnapshot`]s here after every state
//! change; the HTTP server reads them without ever touching the scheduler
//! task. Writes replace whole snapshots, so readers never see a
//! half-updated market.

use crate::clock::Clock;
use crate::runner::RunnerSnapshot;
use dashmap::DashMap;
use std::sync::Arc;

pub struct MetricsHub {
    started_at_ms: u64,
    clock: Arc<dyn Clock>,
    runners: DashMap<String, RunnerSnapshot>,
}

impl MetricsHub {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            started_at_ms: clock.now_ms(),
            clock,
            runners: DashMap::new(),
        }
    }

    pub fn publish(&self, snapshot: RunnerSnapshot) {
        self.runners.insert(snapshot.name.clone(), snapshot);
    }

    /// Every published snapshot, ordered by market name for stable output.
    pub fn all(&self) -> Vec<RunnerSnapshot> {
        let mut snapshots: Vec<RunnerSnapshot> =
            self.runners.iter().map(|entry| entry.value().clone()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn market_count(&self) -> usize {
        self.runners.len()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.started_at_ms) / 1_000
    }

    /// A market that has failed more often than it has settled is stuck,
    /// not just unlucky; the health endpoint reports the process degraded.
    pub fn degraded(&self) -> bool {
        self.runners
            .iter()
            .any(|entry| entry.value().metrics.fail_count > entry.value().metrics.settle_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::runner::RunnerMetrics;

    fn snapshot(name: &str, settle_count: u64, fail_count: u64) -> RunnerSnapshot {
        RunnerSnapshot {
            name: name.to_string(),
            settling: false,
            scheduled: true,
            metrics: RunnerMetrics {
                settle_count,
                fail_count,
                ..RunnerMetrics::default()
            },
        }
    }

    #[test]
    fn publish_replaces_by_market_name() {
        let clock = Arc::new(ManualClock::new(0));
        let hub = MetricsHub::new(clock);

        hub.publish(snapshot("SUI_1M", 1, 0));
        hub.publish(snapshot("BTC_5M", 2, 0));
        hub.publish(snapshot("SUI_1M", 5, 0));

        let all = hub.all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "BTC_5M");
        assert_eq!(all[1].name, "SUI_1M");
        assert_eq!(all[1].metrics.settle_count, 5);
        assert_eq!(hub.market_count(), 2);
    }

    #[test]
    fn uptime_follows_the_injected_clock() {
        let clock = Arc::new(ManualClock::new(10_000));
        let hub = MetricsHub::new(clock.clone());

        assert_eq!(hub.uptime_secs(), 0);
        clock.advance(65_500);
        assert_eq!(hub.uptime_secs(), 65);
    }

    #[test]
    fn degraded_when_failures_outnumber_settles() {
        let clock = Arc::new(ManualClock::new(0));
        let hub = MetricsHub::new(clock);

        hub.publish(snapshot("SUI_1M", 3, 3));
        assert!(!hub.degraded());

        hub.publish(snapshot("BTC_5M", 0, 1));
        assert!(hub.degraded());

        hub.publish(snapshot("BTC_5M", 2, 1));
        assert!(!hub.degraded());
    }
}
