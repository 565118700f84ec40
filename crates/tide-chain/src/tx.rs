//! Typed move-call plans and their JSON encoding.
//!
//! A plan is pure data: an ordered list of move calls executed as one
//! transaction. Encoding to the node's batch transaction builder lives here
//! so argument quirks (u64 as strings, byte vectors as hex) stay in one
//! place. Nothing in this module performs I/O or signing.

use crate::error::{ChainError, ChainResult};
use serde_json::{json, Value};

/// Object ids of the deployed contracts the keeper drives.
#[derive(Debug, Clone)]
pub struct ContractIds {
    pub package_id: String,
    pub registry_id: String,
    pub admin_cap_id: String,
    pub pyth_package_id: String,
    pub pyth_state_id: String,
    pub wormhole_state_id: String,
    /// Shared clock object, `0x6` on every network.
    pub clock_id: String,
}

/// One move-call argument, encoded per the node's JSON argument rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallArg {
    /// Shared or owned object, by id.
    Object(String),
    U8(u8),
    /// u64 travels as a string to survive JSON number precision.
    U64(u64),
    /// vector<u8>, hex-encoded with a 0x prefix.
    Bytes(Vec<u8>),
}

impl CallArg {
    fn to_json(&self) -> Value {
        match self {
            CallArg::Object(id) => json!(id),
            CallArg::U8(v) => json!(v),
            CallArg::U64(v) => json!(v.to_string()),
            CallArg::Bytes(b) => json!(format!("0x{}", hex::encode(b))),
        }
    }
}

/// One `module::function` invocation.
#[derive(Debug, Clone)]
pub struct MoveCall {
    pub package: String,
    pub module: &'static str,
    pub function: &'static str,
    pub args: Vec<CallArg>,
}

impl MoveCall {
    /// Entry for the batch builder's `single_transaction_params` list.
    pub fn to_request_params(&self) -> Value {
        json!({
            "moveCallRequestParams": {
                "packageObjectId": self.package,
                "module": self.module,
                "function": self.function,
                "typeArguments": [],
                "arguments": self.args.iter().map(CallArg::to_json).collect::<Vec<_>>(),
            }
        })
    }

    fn target(&self) -> String {
        format!("{}::{}", self.module, self.function)
    }
}

/// Ordered move calls submitted as a single transaction.
#[derive(Debug, Clone)]
pub struct TxPlan {
    pub calls: Vec<MoveCall>,
}

impl TxPlan {
    fn single(call: MoveCall) -> Self {
        Self { calls: vec![call] }
    }

    /// `module::function` targets joined for logs.
    #[must_use]
    pub fn describe(&self) -> String {
        self.calls
            .iter()
            .map(MoveCall::target)
            .collect::<Vec<_>>()
            .join(" + ")
    }

    pub fn to_request_params(&self) -> Vec<Value> {
        self.calls.iter().map(MoveCall::to_request_params).collect()
    }
}

/// Builds plans for every contract entry point the keeper uses.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    ids: ContractIds,
}

impl TxBuilder {
    #[must_use]
    pub fn new(ids: ContractIds) -> Self {
        Self { ids }
    }

    /// Oracle refresh for the market's price-info object, then settlement.
    /// One update call per payload so multi-part oracle updates land in
    /// order before the settle call reads the refreshed price.
    #[must_use]
    pub fn settle_and_advance(
        &self,
        market_id: &str,
        price_info_object_id: &str,
        updates: &[Vec<u8>],
    ) -> TxPlan {
        let mut calls = Vec::with_capacity(updates.len() + 1);
        for update in updates {
            calls.push(MoveCall {
                package: self.ids.pyth_package_id.clone(),
                module: "pyth",
                function: "update_single_price_feed",
                args: vec![
                    CallArg::Object(self.ids.pyth_state_id.clone()),
                    CallArg::Object(self.ids.wormhole_state_id.clone()),
                    CallArg::Bytes(update.clone()),
                    CallArg::Object(price_info_object_id.to_string()),
                    CallArg::Object(self.ids.clock_id.clone()),
                ],
            });
        }
        calls.push(MoveCall {
            package: self.ids.package_id.clone(),
            module: "market",
            function: "settle_and_advance",
            args: vec![
                CallArg::Object(self.ids.registry_id.clone()),
                CallArg::Object(market_id.to_string()),
                CallArg::Object(price_info_object_id.to_string()),
                CallArg::Object(self.ids.clock_id.clone()),
            ],
        });
        TxPlan { calls }
    }

    /// Admin: halt round progression.
    #[must_use]
    pub fn pause_market(&self, market_id: &str) -> TxPlan {
        TxPlan::single(MoveCall {
            package: self.ids.package_id.clone(),
            module: "market",
            function: "pause_market",
            args: vec![
                CallArg::Object(self.ids.admin_cap_id.clone()),
                CallArg::Object(market_id.to_string()),
            ],
        })
    }

    /// Admin: resume with a fresh upcoming round at `start_time_ms`.
    #[must_use]
    pub fn resume_market(&self, market_id: &str, start_time_ms: u64) -> TxPlan {
        TxPlan::single(MoveCall {
            package: self.ids.package_id.clone(),
            module: "market",
            function: "resume_market",
            args: vec![
                CallArg::Object(self.ids.admin_cap_id.clone()),
                CallArg::Object(market_id.to_string()),
                CallArg::U64(start_time_ms),
                CallArg::Object(self.ids.clock_id.clone()),
            ],
        })
    }

    /// Admin: create a market for an oracle feed. `feed_id` is hex with an
    /// optional 0x prefix; the contract stores it as vector<u8>.
    pub fn create_market(
        &self,
        feed_id: &str,
        interval_ms: u64,
        min_bet_mist: u64,
        start_time_ms: u64,
    ) -> ChainResult<TxPlan> {
        let feed = hex::decode(feed_id.trim_start_matches("0x"))
            .map_err(|e| ChainError::Parse(format!("invalid feed id hex: {e}")))?;
        Ok(TxPlan::single(MoveCall {
            package: self.ids.package_id.clone(),
            module: "market",
            function: "create_market",
            args: vec![
                CallArg::Object(self.ids.admin_cap_id.clone()),
                CallArg::Object(self.ids.registry_id.clone()),
                CallArg::Bytes(feed),
                CallArg::U64(interval_ms),
                CallArg::U64(min_bet_mist),
                CallArg::U64(start_time_ms),
                CallArg::Object(self.ids.clock_id.clone()),
            ],
        }))
    }

    /// Bet on the live round. `direction` is the raw code (0 up, 1 down)
    /// and `coin_id` an exact-amount coin owned by the signer.
    #[must_use]
    pub fn place_bet(&self, market_id: &str, direction: u8, coin_id: &str) -> TxPlan {
        TxPlan::single(MoveCall {
            package: self.ids.package_id.clone(),
            module: "bet",
            function: "place_bet",
            args: vec![
                CallArg::Object(market_id.to_string()),
                CallArg::U8(direction),
                CallArg::Object(coin_id.to_string()),
            ],
        })
    }

    /// Redeem a batch of tickets in one transaction, one call per ticket.
    #[must_use]
    pub fn redeem(&self, market_id: &str, ticket_ids: &[String]) -> TxPlan {
        let calls = ticket_ids
            .iter()
            .map(|ticket_id| MoveCall {
                package: self.ids.package_id.clone(),
                module: "bet",
                function: "redeem",
                args: vec![
                    CallArg::Object(market_id.to_string()),
                    CallArg::Object(ticket_id.clone()),
                ],
            })
            .collect();
        TxPlan { calls }
    }

    /// Admin: replace registry settlement parameters.
    #[must_use]
    pub fn update_config(
        &self,
        fee_bps: u64,
        settler_reward_bps: u64,
        price_tolerance_ms: u64,
    ) -> TxPlan {
        TxPlan::single(MoveCall {
            package: self.ids.package_id.clone(),
            module: "registry",
            function: "update_config",
            args: vec![
                CallArg::Object(self.ids.admin_cap_id.clone()),
                CallArg::Object(self.ids.registry_id.clone()),
                CallArg::U64(fee_bps),
                CallArg::U64(settler_reward_bps),
                CallArg::U64(price_tolerance_ms),
            ],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> TxBuilder {
        TxBuilder::new(ContractIds {
            package_id: "0xpkg".into(),
            registry_id: "0xreg".into(),
            admin_cap_id: "0xcap".into(),
            pyth_package_id: "0xpyth".into(),
            pyth_state_id: "0xpythstate".into(),
            wormhole_state_id: "0xwormhole".into(),
            clock_id: "0x6".into(),
        })
    }

    #[test]
    fn settle_plan_updates_oracle_before_settling() {
        let plan = builder().settle_and_advance("0xmarket", "0xinfo", &[vec![0xab, 0xcd]]);

        assert_eq!(plan.calls.len(), 2);
        assert_eq!(plan.calls[0].function, "update_single_price_feed");
        assert_eq!(plan.calls[1].function, "settle_and_advance");
        assert_eq!(plan.describe(), "pyth::update_single_price_feed + market::settle_and_advance");

        let update = plan.calls[0].to_request_params();
        let args = &update["moveCallRequestParams"]["arguments"];
        assert_eq!(args[2], "0xabcd");

        let settle = plan.calls[1].to_request_params();
        let params = &settle["moveCallRequestParams"];
        assert_eq!(params["packageObjectId"], "0xpkg");
        assert_eq!(params["module"], "market");
        assert_eq!(params["arguments"][1], "0xmarket");
    }

    #[test]
    fn u64_arguments_encode_as_strings() {
        let plan = builder().resume_market("0xmarket", 1_700_000_060_000);
        let params = plan.calls[0].to_request_params();
        let args = &params["moveCallRequestParams"]["arguments"];

        assert_eq!(args[2], "1700000060000");
        assert!(args[2].is_string());
    }

    #[test]
    fn u8_arguments_stay_numeric() {
        let plan = builder().place_bet("0xmarket", 1, "0xcoin");
        let args = plan.calls[0].to_request_params()["moveCallRequestParams"]["arguments"].clone();

        assert_eq!(args[1], 1);
        assert!(args[1].is_number());
    }

    #[test]
    fn create_market_decodes_the_feed_id() {
        let plan = builder()
            .create_market("0xdeadbeef", 60_000, 100_000_000, 1_700_000_000_000)
            .unwrap();
        let args = plan.calls[0].to_request_params()["moveCallRequestParams"]["arguments"].clone();
        assert_eq!(args[2], "0xdeadbeef");

        let err = builder()
            .create_market("not-hex", 60_000, 100_000_000, 0)
            .unwrap_err();
        assert!(matches!(err, ChainError::Parse(_)));
    }

    #[test]
    fn redeem_batches_one_call_per_ticket() {
        let tickets = vec!["0xt1".to_string(), "0xt2".to_string(), "0xt3".to_string()];
        let plan = builder().redeem("0xmarket", &tickets);

        assert_eq!(plan.calls.len(), 3);
        assert!(plan.calls.iter().all(|c| c.function == "redeem"));
        assert_eq!(
            plan.calls[2].to_request_params()["moveCallRequestParams"]["arguments"][1],
            "0xt3"
        );
    }

    #[test]
    fn update_config_targets_the_registry_module() {
        let plan = builder().update_config(300, 100, 60_000);
        let params = plan.calls[0].to_request_params()["moveCallRequestParams"].clone();

        assert_eq!(params["module"], "registry");
        assert_eq!(params["arguments"][0], "0xcap");
        assert_eq!(params["arguments"][4], "60000");
    }
}
