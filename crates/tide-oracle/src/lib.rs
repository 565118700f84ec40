//! Hermes price update client.
//!
//! Settlement transactions carry a signed oracle payload fetched from a
//! Hermes endpoint. The payload stays opaque here; the ledger's oracle
//! contract is the only consumer that decodes it.

pub mod error;
pub mod hermes;

pub use error::{OracleError, OracleResult};
pub use hermes::{endpoint_for_network, HermesClient, MAINNET_ENDPOINT, TESTNET_ENDPOINT};
