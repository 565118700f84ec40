//! High-level fullnode client: object reads, plan assembly, and
//! effects-checked submission.
//!
//! Reads go through the standard object endpoints; writes go through the
//! node's batch transaction builder, get signed locally, and are submitted
//! with local-execution confirmation. A transaction whose effects status is
//! not success is an error here, never a silent no-op.

use crate::error::{ChainError, ChainResult};
use crate::parse;
use crate::rpc::JsonRpcClient;
use crate::signer::KeypairSigner;
use crate::tx::TxPlan;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};
use tide_core::{MarketSnapshot, MarketState, RegistryConfig, RoundData, Ticket, UpcomingRound};
use tracing::{debug, info};

/// Gas coin owned by the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinInfo {
    pub coin_object_id: String,
    pub balance: u64,
}

pub struct SuiClient {
    rpc: JsonRpcClient,
    signer: KeypairSigner,
    gas_budget_mist: u64,
}

impl SuiClient {
    pub fn new(
        rpc_url: impl Into<String>,
        signer: KeypairSigner,
        gas_budget_mist: u64,
    ) -> ChainResult<Self> {
        Ok(Self {
            rpc: JsonRpcClient::new(rpc_url)?,
            signer,
            gas_budget_mist,
        })
    }

    /// Signer's on-chain address.
    #[must_use]
    pub fn address(&self) -> &str {
        self.signer.address()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn market_state(&self, market_id: &str) -> ChainResult<Option<MarketState>> {
        let response: Value = self
            .rpc
            .call("sui_getObject", json!([market_id, { "showContent": true }]))
            .await?;
        Ok(parse::object_fields(&response).and_then(parse::parse_market_state))
    }

    pub async fn registry_config(&self, registry_id: &str) -> ChainResult<Option<RegistryConfig>> {
        let response: Value = self
            .rpc
            .call("sui_getObject", json!([registry_id, { "showContent": true }]))
            .await?;
        Ok(parse::object_fields(&response).and_then(parse::parse_registry_config))
    }

    /// Market object plus, when the market is active with a pending round,
    /// that round's start time. The table read is skipped otherwise, so a
    /// paused market costs one RPC.
    pub async fn market_snapshot(&self, market_id: &str) -> ChainResult<Option<MarketSnapshot>> {
        let Some(state) = self.market_state(market_id).await? else {
            return Ok(None);
        };
        let upcoming = if state.status.is_active() && state.upcoming_round != 0 {
            self.upcoming_round(&state.rounds_table_id, state.upcoming_round)
                .await?
        } else {
            None
        };
        Ok(Some(MarketSnapshot { state, upcoming }))
    }

    pub async fn upcoming_round(
        &self,
        table_id: &str,
        round_number: u64,
    ) -> ChainResult<Option<UpcomingRound>> {
        Ok(self
            .round_fields(table_id, round_number)
            .await?
            .as_ref()
            .and_then(|fields| parse::parse_upcoming_round(fields, round_number)))
    }

    pub async fn round(&self, table_id: &str, round_number: u64) -> ChainResult<Option<RoundData>> {
        Ok(self
            .round_fields(table_id, round_number)
            .await?
            .as_ref()
            .and_then(|fields| parse::parse_round(fields)))
    }

    /// Last `count` rounds, oldest first. Missing rows are skipped rather
    /// than treated as errors.
    pub async fn recent_rounds(
        &self,
        market_id: &str,
        count: u64,
    ) -> ChainResult<Option<(MarketState, Vec<RoundData>)>> {
        let Some(state) = self.market_state(market_id).await? else {
            return Ok(None);
        };
        let mut rounds = Vec::new();
        if state.round_count > 0 {
            let first = state
                .round_count
                .saturating_sub(count.saturating_sub(1))
                .max(1);
            for number in first..=state.round_count {
                if let Some(round) = self.round(&state.rounds_table_id, number).await? {
                    rounds.push(round);
                }
            }
        }
        Ok(Some((state, rounds)))
    }

    /// Every bet ticket the signer owns, following pagination. `market_id`
    /// narrows to one market when given.
    pub async fn owned_tickets(
        &self,
        package_id: &str,
        market_id: Option<&str>,
    ) -> ChainResult<Vec<Ticket>> {
        let ticket_type = format!("{package_id}::bet::Ticket");
        let mut tickets = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = json!([
                self.address(),
                {
                    "filter": { "StructType": ticket_type },
                    "options": { "showContent": true },
                },
                cursor,
                null,
            ]);
            let page: Value = self.rpc.call("suix_getOwnedObjects", params).await?;

            if let Some(items) = page.get("data").and_then(Value::as_array) {
                for item in items {
                    let Some(object_id) = item.pointer("/data/objectId").and_then(Value::as_str)
                    else {
                        continue;
                    };
                    let Some(ticket) = parse::object_fields(item)
                        .and_then(|fields| parse::parse_ticket(object_id, fields))
                    else {
                        continue;
                    };
                    if market_id.map_or(true, |id| ticket.market_id == id) {
                        tickets.push(ticket);
                    }
                }
            }

            if !page
                .get("hasNextPage")
                .and_then(Value::as_bool)
                .unwrap_or(false)
            {
                break;
            }
            cursor = page
                .get("nextCursor")
                .and_then(Value::as_str)
                .map(String::from);
            if cursor.is_none() {
                break;
            }
        }
        Ok(tickets)
    }

    /// Gas coins owned by the signer (first page; the keeper account keeps
    /// a handful of coins at most).
    pub async fn coins(&self) -> ChainResult<Vec<CoinInfo>> {
        let page: Value = self
            .rpc
            .call("suix_getCoins", json!([self.address(), null, null, null]))
            .await?;
        let mut coins = Vec::new();
        if let Some(items) = page.get("data").and_then(Value::as_array) {
            for item in items {
                let id = item.get("coinObjectId").and_then(Value::as_str);
                let balance = item.get("balance").and_then(parse::move_u64);
                if let (Some(id), Some(balance)) = (id, balance) {
                    coins.push(CoinInfo {
                        coin_object_id: id.to_string(),
                        balance,
                    });
                }
            }
        }
        Ok(coins)
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Assemble the plan into a transaction, sign it, submit it, and check
    /// effects. Returns the transaction digest.
    pub async fn execute_plan(&self, plan: &TxPlan) -> ChainResult<String> {
        debug!(calls = %plan.describe(), "Building transaction");
        let params = json!([
            self.address(),
            plan.to_request_params(),
            null,
            self.gas_budget_mist.to_string(),
            null,
        ]);
        let built: Value = self.rpc.call("unsafe_batchTransaction", params).await?;
        let response = self.sign_and_submit(tx_bytes_of(&built)?).await?;
        let digest = digest_of(&response)?;
        info!(%digest, calls = %plan.describe(), "Transaction executed");
        Ok(digest)
    }

    /// Split an exact-amount coin off one of the signer's gas coins and
    /// return the created coin's id. This is its own transaction: the batch
    /// builder cannot thread a split result into a later call.
    pub async fn split_coin(&self, amount_mist: u64) -> ChainResult<String> {
        let coins = self.coins().await?;
        let needed = amount_mist.saturating_add(self.gas_budget_mist);
        let source =
            pick_split_source(&coins, needed).ok_or(ChainError::InsufficientCoins { needed })?;

        let params = json!([
            self.address(),
            source.coin_object_id,
            [amount_mist.to_string()],
            null,
            self.gas_budget_mist.to_string(),
        ]);
        let built: Value = self.rpc.call("unsafe_splitCoin", params).await?;
        let response = self.sign_and_submit(tx_bytes_of(&built)?).await?;
        let coin_id = created_object_id(&response)?;
        debug!(coin = %coin_id, amount_mist, "Split coin created");
        Ok(coin_id)
    }

    async fn sign_and_submit(&self, tx_bytes_b64: &str) -> ChainResult<Value> {
        let raw = BASE64
            .decode(tx_bytes_b64)
            .map_err(|e| ChainError::Parse(format!("invalid transaction bytes: {e}")))?;
        let signature = self.signer.sign_transaction(&raw);

        let params = json!([
            tx_bytes_b64,
            [signature],
            { "showEffects": true, "showEvents": true },
            "WaitForLocalExecution",
        ]);
        let response: Value = self
            .rpc
            .call("sui_executeTransactionBlock", params)
            .await?;
        check_effects(&response)?;
        Ok(response)
    }

    async fn round_fields(&self, table_id: &str, round_number: u64) -> ChainResult<Option<Value>> {
        let params = json!([table_id, { "type": "u64", "value": round_number.to_string() }]);
        let response: Value = match self.rpc.call("suix_getDynamicFieldObject", params).await {
            Ok(response) => response,
            // Nodes report a missing row as an RPC error rather than an
            // empty response; transport failures still propagate.
            Err(ChainError::Rpc { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(parse::object_fields(&response)
            .and_then(parse::dynamic_field_value)
            .cloned())
    }
}

fn tx_bytes_of(built: &Value) -> ChainResult<&str> {
    built
        .get("txBytes")
        .and_then(Value::as_str)
        .ok_or_else(|| ChainError::Parse("missing txBytes in builder response".into()))
}

fn digest_of(response: &Value) -> ChainResult<String> {
    response
        .get("digest")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ChainError::Parse("missing digest in execution response".into()))
}

fn check_effects(response: &Value) -> ChainResult<()> {
    match response
        .pointer("/effects/status/status")
        .and_then(Value::as_str)
    {
        Some("success") => Ok(()),
        Some(_) => {
            let error = response
                .pointer("/effects/status/error")
                .and_then(Value::as_str)
                .unwrap_or("unknown failure");
            Err(ChainError::TxFailed(error.to_string()))
        }
        None => Err(ChainError::Parse("missing effects status".into())),
    }
}

fn created_object_id(response: &Value) -> ChainResult<String> {
    response
        .pointer("/effects/created/0/reference/objectId")
        .and_then(Value::as_str)
        .map(String::from)
        .ok_or_else(|| ChainError::Parse("no created object in effects".into()))
}

/// Smallest coin that covers the amount, so large gas coins stay whole.
fn pick_split_source(coins: &[CoinInfo], needed: u64) -> Option<&CoinInfo> {
    coins
        .iter()
        .filter(|c| c.balance >= needed)
        .min_by_key(|c| c.balance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn effects_success_passes_and_failure_surfaces_the_error() {
        let ok = json!({ "digest": "D1", "effects": { "status": { "status": "success" } } });
        assert!(check_effects(&ok).is_ok());
        assert_eq!(digest_of(&ok).unwrap(), "D1");

        let failed = json!({
            "digest": "D2",
            "effects": { "status": { "status": "failure", "error": "MoveAbort(3)" } }
        });
        let err = check_effects(&failed).unwrap_err();
        assert!(matches!(err, ChainError::TxFailed(msg) if msg == "MoveAbort(3)"));

        let malformed = json!({ "digest": "D3" });
        assert!(matches!(
            check_effects(&malformed).unwrap_err(),
            ChainError::Parse(_)
        ));
    }

    #[test]
    fn created_object_id_reads_the_first_created_reference() {
        let response = json!({
            "effects": {
                "status": { "status": "success" },
                "created": [
                    { "owner": { "AddressOwner": "0xme" }, "reference": { "objectId": "0xnewcoin" } }
                ]
            }
        });
        assert_eq!(created_object_id(&response).unwrap(), "0xnewcoin");

        let none = json!({ "effects": { "status": { "status": "success" } } });
        assert!(created_object_id(&none).is_err());
    }

    #[test]
    fn split_source_prefers_the_smallest_sufficient_coin() {
        let coins = vec![
            CoinInfo { coin_object_id: "0xa".into(), balance: 10_000_000_000 },
            CoinInfo { coin_object_id: "0xb".into(), balance: 3_000_000_000 },
            CoinInfo { coin_object_id: "0xc".into(), balance: 500_000_000 },
        ];

        let picked = pick_split_source(&coins, 2_000_000_000).unwrap();
        assert_eq!(picked.coin_object_id, "0xb");

        assert!(pick_split_source(&coins, 20_000_000_000).is_none());
    }

    #[test]
    fn tx_bytes_extraction_requires_the_field() {
        let built = json!({ "txBytes": "AAEC", "gas": [] });
        assert_eq!(tx_bytes_of(&built).unwrap(), "AAEC");
        assert!(tx_bytes_of(&json!({})).is_err());
    }
}
