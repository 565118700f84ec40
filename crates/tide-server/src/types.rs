//! Endpoint response types.
//!
//! Wire shapes for the health and metrics endpoints. Keys are camelCase;
//! timestamps go out as ISO-8601 with millisecond precision.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use tide_engine::{MetricsHub, RunnerSnapshot};

/// `GET /health` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when any market has failed more than it settled.
    pub status: &'static str,
    /// Seconds since the keeper started.
    pub uptime: u64,
    /// Number of markets under management.
    pub markets: usize,
}

impl HealthResponse {
    pub fn collect(hub: &MetricsHub) -> Self {
        Self {
            status: if hub.degraded() { "degraded" } else { "ok" },
            uptime: hub.uptime_secs(),
            markets: hub.market_count(),
        }
    }
}

/// `GET /metrics` body.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub uptime: u64,
    /// Per-market counters keyed by market name.
    pub markets: BTreeMap<String, MarketMetrics>,
}

impl MetricsResponse {
    pub fn collect(hub: &MetricsHub) -> Self {
        let markets = hub
            .all()
            .iter()
            .map(|snapshot| (snapshot.name.clone(), MarketMetrics::from_snapshot(snapshot)))
            .collect();
        Self {
            uptime: hub.uptime_secs(),
            markets,
        }
    }
}

/// One market's counters as exported over HTTP.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMetrics {
    /// A settlement transaction is in flight right now.
    pub settling: bool,
    /// A wake-up timer is pending.
    pub scheduled: bool,
    pub settle_count: u64,
    pub fail_count: u64,
    pub retry_count: u64,
    /// When the last successful settlement landed, ISO-8601.
    pub last_settle_time: Option<String>,
    /// Most recent error message; sticks around after recovery.
    pub last_error: Option<String>,
}

impl MarketMetrics {
    pub fn from_snapshot(snapshot: &RunnerSnapshot) -> Self {
        Self {
            settling: snapshot.settling,
            scheduled: snapshot.scheduled,
            settle_count: snapshot.metrics.settle_count,
            fail_count: snapshot.metrics.fail_count,
            retry_count: snapshot.metrics.retry_count,
            last_settle_time: snapshot.metrics.last_settle_time_ms.and_then(iso_timestamp),
            last_error: snapshot.metrics.last_error.clone(),
        }
    }
}

fn iso_timestamp(unix_ms: u64) -> Option<String> {
    DateTime::from_timestamp_millis(unix_ms as i64)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
