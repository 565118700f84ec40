//! Settlement scheduling and staleness recovery for the tide keeper.
//!
//! This crate is the keeper's decision core. Everything chain-facing sits
//! behind the [`ChainReader`]/[`TxExecutor`] ports, and every due/stale
//! comparison goes through the injected [`Clock`], so the whole engine runs
//! against scripted fakes and a manual clock in tests.
//!
//! # Key components
//!
//! - [`CatchUpEngine`]: decides per market between no-op, settle, drain, and
//!   reset (pause + resume); never propagates errors
//! - [`RetryingExecutor`]: bounded exponential backoff around one settlement
//! - [`MarketStateReader`]: chain reads plus the TTL registry-config cache
//! - [`Scheduler`]: owns every [`MarketRunner`], their wake-up timers, the
//!   serialized settlement queue, and the heartbeat sweep
//! - [`MetricsHub`]: runner snapshots published for the HTTP endpoint
//!
//! # Serialization invariant
//!
//! The scheduler drains due markets strictly one at a time, so no two
//! settlement transactions are ever in flight concurrently. All of the
//! keeper's transactions spend from one signer; concurrent submissions
//! would contend over the same gas objects and fail spuriously.

pub mod catch_up;
pub mod clock;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod reader;
pub mod retry;
pub mod runner;
pub mod scheduler;

pub use catch_up::{CatchUpEngine, CatchUpResult};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{EngineError, EngineResult};
pub use metrics::MetricsHub;
pub use ports::{
    BoxFuture, ChainReader, DynChainReader, DynTxExecutor, MockChainReader, MockTxExecutor,
    TxExecutor, TxOp,
};
pub use reader::MarketStateReader;
pub use retry::{RetryPolicy, RetryingExecutor, SettleResult};
pub use runner::{MarketRunner, RunnerMetrics, RunnerPhase, RunnerSnapshot};
pub use scheduler::{Scheduler, SchedulerConfig};
