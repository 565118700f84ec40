//! Health and metrics HTTP endpoint for the tide keeper.
//!
//! Serves two read-only routes off the scheduler's [`MetricsHub`]:
//!
//! - `GET /health`: liveness plus a degraded flag for markets that fail
//!   more than they settle
//! - `GET /metrics`: per-market settle/fail/retry counters and the last
//!   settlement time
//!
//! The server never touches the scheduler task; it only reads published
//! snapshots, so a slow scrape cannot delay a settlement.
//!
//! [`MetricsHub`]: tide_engine::MetricsHub

pub mod error;
pub mod server;
pub mod types;

pub use error::{ServerError, ServerResult};
pub use server::{create_router, run_server, AppState};
pub use types::{HealthResponse, MarketMetrics, MetricsResponse};
