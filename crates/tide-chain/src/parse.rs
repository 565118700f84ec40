//! Wire parsing for fullnode object responses.
//!
//! Move values arrive JSON-encoded with quirks: u64 travels as a string,
//! Option<T> as `{ "vec": [] }` or `{ "vec": [value] }`, and Balance either
//! as a plain string or nested under `{ "fields": { "value": ... } }`.
//! Parsers return `None` on malformed shapes and let callers decide how
//! loud to be about it.

use serde_json::Value;
use tide_core::{
    MarketState, MarketStatus, PriceQuote, RegistryConfig, RoundData, Ticket, UpcomingRound,
};

/// Extract `data.content.fields` from an object read, provided the content
/// is a move object.
pub fn object_fields(response: &Value) -> Option<&Value> {
    let content = response.get("data")?.get("content")?;
    if content.get("dataType")?.as_str()? != "moveObject" {
        return None;
    }
    content.get("fields")
}

/// Dynamic-field rows wrap the stored value under `value`, sometimes with
/// an extra `{ "type": ..., "fields": ... }` layer.
pub fn dynamic_field_value(fields: &Value) -> Option<&Value> {
    let value = fields.get("value")?;
    match value.get("fields") {
        Some(inner) => Some(inner),
        None => Some(value),
    }
}

/// Move u64: a JSON string on the wire, but plain numbers are tolerated.
pub fn move_u64(value: &Value) -> Option<u64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

/// Move Option<T>: `{ "vec": [] }` is none, `{ "vec": [v] }` is some.
/// A bare value is accepted as some for nodes that flatten the wrapper.
pub fn move_option(value: &Value) -> Option<&Value> {
    if value.is_null() {
        return None;
    }
    match value.get("vec") {
        Some(Value::Array(items)) => items.first(),
        _ => Some(value),
    }
}

/// Balance<T>: plain string or `{ "fields": { "value": ... } }`.
pub fn balance_value(value: &Value) -> u64 {
    if let Some(v) = move_u64(value) {
        return v;
    }
    value
        .get("fields")
        .and_then(|f| f.get("value"))
        .and_then(move_u64)
        .unwrap_or(0)
}

fn field_u64(fields: &Value, name: &str) -> Option<u64> {
    move_u64(fields.get(name)?)
}

fn field_u8(fields: &Value, name: &str) -> Option<u8> {
    u8::try_from(field_u64(fields, name)?).ok()
}

fn option_field_u64(fields: &Value, name: &str) -> Option<u64> {
    fields.get(name).and_then(move_option).and_then(move_u64)
}

/// Price quote from a magnitude field and its exponent companion. Both must
/// be present for the quote to count.
fn option_field_price(fields: &Value, price_name: &str, expo_name: &str) -> Option<PriceQuote> {
    let magnitude = option_field_u64(fields, price_name)?;
    let expo = u32::try_from(option_field_u64(fields, expo_name)?).ok()?;
    Some(PriceQuote { magnitude, expo })
}

/// Market object projection. The rounds table id sits at
/// `rounds.fields.id.id`.
pub fn parse_market_state(fields: &Value) -> Option<MarketState> {
    let rounds_table_id = fields
        .get("rounds")?
        .get("fields")?
        .get("id")?
        .get("id")?
        .as_str()?
        .to_string();

    Some(MarketState {
        status: MarketStatus::from_raw(field_u8(fields, "status")?),
        current_round: field_u64(fields, "current_round")?,
        upcoming_round: field_u64(fields, "upcoming_round")?,
        round_count: field_u64(fields, "round_count")?,
        interval_ms: field_u64(fields, "interval_ms")?,
        rounds_table_id,
    })
}

/// Upcoming-round projection: only the start time matters for scheduling.
pub fn parse_upcoming_round(fields: &Value, round_number: u64) -> Option<UpcomingRound> {
    Some(UpcomingRound {
        round_number,
        start_time_ms: field_u64(fields, "start_time_ms")?,
    })
}

/// Full round row. Bet totals default to zero when absent so freshly
/// created rounds still parse.
pub fn parse_round(fields: &Value) -> Option<RoundData> {
    Some(RoundData {
        round_number: field_u64(fields, "round_number")?,
        status: field_u8(fields, "status")?,
        start_time_ms: field_u64(fields, "start_time_ms")?,
        open_price: option_field_price(fields, "open_price", "open_price_expo"),
        close_price: option_field_price(fields, "close_price", "close_price_expo"),
        open_timestamp_ms: option_field_u64(fields, "open_timestamp_ms"),
        close_timestamp_ms: option_field_u64(fields, "close_timestamp_ms"),
        up_amount: field_u64(fields, "up_amount").unwrap_or(0),
        down_amount: field_u64(fields, "down_amount").unwrap_or(0),
        up_count: field_u64(fields, "up_count").unwrap_or(0),
        down_count: field_u64(fields, "down_count").unwrap_or(0),
        pool_value: fields.get("pool").map(balance_value).unwrap_or(0),
        prize_pool: field_u64(fields, "prize_pool").unwrap_or(0),
        result: option_field_u64(fields, "result").and_then(|v| u8::try_from(v).ok()),
    })
}

/// Registry settlement parameters.
pub fn parse_registry_config(fields: &Value) -> Option<RegistryConfig> {
    Some(RegistryConfig {
        fee_bps: field_u64(fields, "fee_bps")?,
        settler_reward_bps: field_u64(fields, "settler_reward_bps")?,
        price_tolerance_ms: field_u64(fields, "price_tolerance_ms")?,
    })
}

/// Bet receipt owned by the signer.
pub fn parse_ticket(object_id: &str, fields: &Value) -> Option<Ticket> {
    Some(Ticket {
        object_id: object_id.to_string(),
        market_id: fields.get("market_id")?.as_str()?.to_string(),
        round_number: field_u64(fields, "round_number")?,
        direction: field_u8(fields, "direction")?,
        amount: field_u64(fields, "amount")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn market_object(status: u64, upcoming_round: u64) -> Value {
        json!({
            "data": {
                "objectId": "0xmarket",
                "content": {
                    "dataType": "moveObject",
                    "type": "0xpkg::market::Market",
                    "fields": {
                        "status": status.to_string(),
                        "current_round": "41",
                        "upcoming_round": upcoming_round.to_string(),
                        "round_count": "42",
                        "interval_ms": "60000",
                        "rounds": { "fields": { "id": { "id": "0xtable" } } }
                    }
                }
            }
        })
    }

    #[test]
    fn market_object_round_trips_through_fields() {
        let response = market_object(0, 42);
        let state = object_fields(&response)
            .and_then(parse_market_state)
            .unwrap();

        assert!(state.status.is_active());
        assert_eq!(state.current_round, 41);
        assert_eq!(state.upcoming_round, 42);
        assert_eq!(state.interval_ms, 60_000);
        assert_eq!(state.rounds_table_id, "0xtable");
    }

    #[test]
    fn non_move_content_yields_nothing() {
        let response = json!({
            "data": { "content": { "dataType": "package" } }
        });
        assert!(object_fields(&response).is_none());

        let missing = json!({ "error": { "code": "notExists" } });
        assert!(object_fields(&missing).is_none());
    }

    #[test]
    fn move_u64_accepts_strings_and_numbers() {
        assert_eq!(move_u64(&json!("12345")), Some(12_345));
        assert_eq!(move_u64(&json!(77)), Some(77));
        assert_eq!(move_u64(&json!("not a number")), None);
        assert_eq!(move_u64(&json!(null)), None);
    }

    #[test]
    fn move_option_handles_vec_wrapper_and_flat_values() {
        assert!(move_option(&json!({ "vec": [] })).is_none());
        assert_eq!(
            move_option(&json!({ "vec": ["9"] })).and_then(move_u64),
            Some(9)
        );
        assert_eq!(move_option(&json!("3")).and_then(move_u64), Some(3));
        assert!(move_option(&json!(null)).is_none());
    }

    #[test]
    fn balance_parses_plain_and_nested_forms() {
        assert_eq!(balance_value(&json!("5000000000")), 5_000_000_000);
        assert_eq!(
            balance_value(&json!({ "fields": { "value": "123" } })),
            123
        );
        assert_eq!(balance_value(&json!({})), 0);
    }

    #[test]
    fn dynamic_field_value_unwraps_both_layouts() {
        let wrapped = json!({
            "name": { "type": "u64", "value": "42" },
            "value": { "type": "0xpkg::market::Round", "fields": { "start_time_ms": "1000" } }
        });
        let row = dynamic_field_value(&wrapped).unwrap();
        assert_eq!(field_u64(row, "start_time_ms"), Some(1000));

        let flat = json!({ "value": { "start_time_ms": "2000" } });
        let row = dynamic_field_value(&flat).unwrap();
        assert_eq!(field_u64(row, "start_time_ms"), Some(2000));
    }

    #[test]
    fn round_row_parses_with_and_without_prices() {
        let settled = json!({
            "round_number": "42",
            "status": "2",
            "start_time_ms": "1700000000000",
            "open_price": { "vec": ["351000000"] },
            "open_price_expo": { "vec": ["8"] },
            "close_price": { "vec": ["352000000"] },
            "close_price_expo": { "vec": ["8"] },
            "open_timestamp_ms": { "vec": ["1700000000100"] },
            "close_timestamp_ms": { "vec": ["1700000060100"] },
            "up_amount": "3000000000",
            "down_amount": "1000000000",
            "up_count": "3",
            "down_count": "1",
            "pool": "4000000000",
            "prize_pool": "3900000000",
            "result": { "vec": ["0"] }
        });
        let round = parse_round(&settled).unwrap();
        assert_eq!(round.round_number, 42);
        assert_eq!(round.status, 2);
        assert_eq!(
            round.open_price,
            Some(PriceQuote { magnitude: 351_000_000, expo: 8 })
        );
        assert_eq!(round.total_bet_amount(), 4_000_000_000);
        assert_eq!(round.result, Some(0));

        let upcoming = json!({
            "round_number": "43",
            "status": "0",
            "start_time_ms": "1700000060000",
            "open_price": { "vec": [] },
            "open_price_expo": { "vec": [] },
            "close_price": { "vec": [] },
            "close_price_expo": { "vec": [] },
            "result": { "vec": [] }
        });
        let round = parse_round(&upcoming).unwrap();
        assert!(round.open_price.is_none());
        assert!(round.result.is_none());
        assert_eq!(round.pool_value, 0);
    }

    #[test]
    fn registry_config_parses() {
        let fields = json!({
            "fee_bps": "300",
            "settler_reward_bps": "100",
            "price_tolerance_ms": "60000"
        });
        let config = parse_registry_config(&fields).unwrap();
        assert_eq!(config.fee_bps, 300);
        assert_eq!(config.settler_reward_bps, 100);
        assert_eq!(config.price_tolerance_ms, 60_000);
    }

    #[test]
    fn ticket_parses_from_owned_object_fields() {
        let fields = json!({
            "market_id": "0xmarket",
            "round_number": "40",
            "direction": "1",
            "amount": "2000000000"
        });
        let ticket = parse_ticket("0xticket", &fields).unwrap();
        assert_eq!(ticket.object_id, "0xticket");
        assert_eq!(ticket.market_id, "0xmarket");
        assert_eq!(ticket.direction, 1);
        assert_eq!(ticket.amount, 2_000_000_000);
    }

    #[test]
    fn upcoming_round_needs_a_start_time() {
        let fields = json!({ "start_time_ms": "1700000060000", "status": "0" });
        let up = parse_upcoming_round(&fields, 43).unwrap();
        assert_eq!(up.round_number, 43);
        assert_eq!(up.start_time_ms, 1_700_000_060_000);

        assert!(parse_upcoming_round(&json!({ "status": "0" }), 43).is_none());
    }
}
