//! HTTP server implementation using axum.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use tide_engine::MetricsHub;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::types::{HealthResponse, MetricsResponse};

/// Shared application state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    hub: Arc<MetricsHub>,
}

impl AppState {
    pub fn new(hub: Arc<MetricsHub>) -> Self {
        Self { hub }
    }
}

/// Create the axum router. Unknown paths 404 and non-GET methods are
/// rejected by the router itself.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::collect(&state.hub))
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse::collect(&state.hub))
}

/// Run the metrics HTTP server until the process exits.
pub async fn run_server(hub: Arc<MetricsHub>, bind: &str) -> ServerResult<()> {
    let app = create_router(AppState::new(hub));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.to_string(),
            source,
        })?;
    info!(addr = %bind, "metrics server listening");

    axum::serve(listener, app).await.map_err(ServerError::Serve)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tide_engine::{ManualClock, RunnerMetrics, RunnerSnapshot};

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

    fn hub_with(clock: Arc<ManualClock>, snapshots: &[RunnerSnapshot]) -> Arc<MetricsHub> {
        let hub = Arc::new(MetricsHub::new(clock));
        for snap in snapshots {
            hub.publish(snap.clone());
        }
        hub
    }

    #[tokio::test]
    async fn health_reports_ok_with_uptime_and_market_count() {
        let clock = Arc::new(ManualClock::new(0));
        let hub = hub_with(clock.clone(), &[snapshot("SUI_1M", 4, 2)]);
        clock.advance(42_000);

        let body = get_health(State(AppState::new(hub))).await.0;
        assert_eq!(body.status, "ok");
        assert_eq!(body.uptime, 42);
        assert_eq!(body.markets, 1);
    }

    #[tokio::test]
    async fn health_degrades_when_failures_outnumber_settles() {
        let clock = Arc::new(ManualClock::new(0));
        let hub = hub_with(
            clock,
            &[snapshot("SUI_1M", 4, 2), snapshot("BTC_5M", 1, 2)],
        );

        let body = get_health(State(AppState::new(hub))).await.0;
        assert_eq!(body.status, "degraded");
        assert_eq!(body.markets, 2);
    }

    #[tokio::test]
    async fn metrics_groups_counters_by_market_name() {
        let clock = Arc::new(ManualClock::new(0));
        let hub = hub_with(
            clock,
            &[snapshot("SUI_1M", 4, 0), snapshot("BTC_5M", 9, 1)],
        );

        let body = get_metrics(State(AppState::new(hub))).await.0;
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["markets"]["SUI_1M"]["settleCount"], 4);
        assert_eq!(json["markets"]["BTC_5M"]["settleCount"], 9);
        assert_eq!(json["markets"]["BTC_5M"]["failCount"], 1);
        assert!(json["markets"]["SUI_1M"]["lastSettleTime"].is_null());
    }
}
