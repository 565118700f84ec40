//! Fullnode access for the tide keeper.
//!
//! Everything the keeper does on-chain goes through this crate: object reads
//! (markets, rounds, registry, tickets, coins), move-call plan construction,
//! transaction assembly via the node's builder endpoints, local Ed25519
//! signing, and effects-checked submission.

pub mod client;
pub mod error;
pub mod parse;
pub mod rpc;
pub mod signer;
pub mod tx;

pub use client::{CoinInfo, SuiClient};
pub use error::{ChainError, ChainResult};
pub use rpc::JsonRpcClient;
pub use signer::{KeyError, KeySource, KeypairSigner};
pub use tx::{CallArg, ContractIds, MoveCall, TxBuilder, TxPlan};
