//! Structured logging for the tide keeper.
//!
//! JSON output in production, pretty output in development. Log-derived
//! metrics live with the scheduler; this crate only owns subscriber setup.

pub mod error;
pub mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
