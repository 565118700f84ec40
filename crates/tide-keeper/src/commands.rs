//! One-shot operator commands.
//!
//! Everything except `run` goes through [`Ops`]: resolve the market
//! argument, perform one read or one transaction, print the outcome, exit.
//! Settlement commands reuse the daemon's catch-up engine so a manual
//! `settle` behaves exactly like a scheduled one.

use crate::adapters::{ChainAdapter, ExecutorAdapter};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use chrono::{DateTime, SecondsFormat};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Arc;
use tide_chain::{KeySource, KeypairSigner, SuiClient, TxBuilder};
use tide_core::{
    align_to_next_interval, MarketConfig, MarketState, PriceQuote, RoundData, RoundResult,
    RoundStatus,
};
use tide_engine::{
    CatchUpEngine, CatchUpResult, Clock, DynChainReader, DynTxExecutor, MarketStateReader,
    RetryPolicy, SystemClock,
};
use tide_oracle::HermesClient;
use tracing::info;

/// Interval assumed by `resume-market` when the market object cannot be
/// read. Matches the longest cadence the registry ships with.
const FALLBACK_INTERVAL_MS: u64 = 300_000;

/// How many rounds `redeem-all` falls back to scanning when the market
/// object is unreadable.
const FALLBACK_ROUND_SCAN: u64 = 100;

/// Command context: config plus the clients every subcommand shares.
pub struct Ops {
    config: AppConfig,
    client: Arc<SuiClient>,
    builder: TxBuilder,
    oracle: HermesClient,
    clock: Arc<dyn Clock>,
}

impl Ops {
    /// Build the command context. Contract ids must be present; the market
    /// list may be empty, since admin commands are how markets get created
    /// in the first place.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.contracts.validate()?;

        let signer = KeypairSigner::load(&KeySource::EnvVar {
            var_name: config.signer.key_env.clone(),
        })?;
        info!(address = %signer.address(), "Signer loaded");

        let client = Arc::new(SuiClient::new(
            &config.network.rpc_url,
            signer,
            config.signer.gas_budget_mist,
        )?);
        let oracle = HermesClient::new(&config.network.hermes_url)?;
        let builder = TxBuilder::new(config.contracts.ids());

        Ok(Self {
            config,
            client,
            builder,
            oracle,
            clock: Arc::new(SystemClock),
        })
    }

    /// Same engine wiring as the daemon, built fresh for one invocation.
    fn engine(&self) -> CatchUpEngine {
        let chain: DynChainReader = Arc::new(ChainAdapter::new(self.client.clone()));
        let reader = Arc::new(MarketStateReader::new(
            chain,
            self.clock.clone(),
            self.config.contracts.registry_id.clone(),
            self.config.keeper.config_cache_ttl_ms,
        ));
        let executor: DynTxExecutor = Arc::new(ExecutorAdapter::new(
            self.client.clone(),
            self.builder.clone(),
            self.oracle.clone(),
        ));
        CatchUpEngine::new(
            reader,
            executor,
            RetryPolicy {
                max_retries: self.config.keeper.max_retries,
                base_delay_ms: self.config.keeper.retry_base_delay_ms,
            },
            self.clock.clone(),
        )
    }

    fn resolve_or_default(&self, market_arg: Option<&str>) -> AppResult<MarketConfig> {
        match market_arg {
            Some(arg) => self.config.resolve_market(arg),
            None => self.config.default_market().cloned(),
        }
    }

    /// One catch-up pass over a single market.
    pub async fn settle(&self, market_arg: &str) -> AppResult<()> {
        let market = self.config.resolve_market(market_arg)?;
        if market.feed_id.is_empty() {
            return Err(AppError::Market(format!(
                "market {} has no feed id; settle needs a configured market name",
                market.name
            )));
        }
        let result = self.engine().catch_up(&market).await;
        print_catch_up(&market.name, &result);
        Ok(())
    }

    /// One catch-up pass over every configured market. A failing market is
    /// reported and the loop moves on.
    pub async fn settle_all(&self) -> AppResult<()> {
        if self.config.markets.is_empty() {
            return Err(AppError::Config(
                "no [[markets]] configured; nothing to settle".into(),
            ));
        }
        let engine = self.engine();
        for market in &self.config.markets {
            let result = engine.catch_up(market).await;
            print_catch_up(&market.name, &result);
        }
        Ok(())
    }

    pub async fn pause_market(&self, market_arg: &str) -> AppResult<()> {
        let market = self.config.resolve_market(market_arg)?;
        let digest = self
            .client
            .execute_plan(&self.builder.pause_market(&market.market_id))
            .await?;
        println!("Paused {}: {digest}", market.name);
        Ok(())
    }

    /// Resume a paused market. Without an explicit start time the next
    /// round is aligned to the interval read from the market object.
    pub async fn resume_market(
        &self,
        market_arg: &str,
        start_time_ms: Option<u64>,
    ) -> AppResult<()> {
        let market = self.config.resolve_market(market_arg)?;
        let start = match start_time_ms {
            Some(start) => start,
            None => {
                let interval = self
                    .client
                    .market_state(&market.market_id)
                    .await?
                    .map(|state| state.interval_ms)
                    .filter(|ms| *ms > 0)
                    .unwrap_or(FALLBACK_INTERVAL_MS);
                align_to_next_interval(self.clock.now_ms(), interval)
            }
        };
        println!(
            "Resuming {} with first round at {}",
            market.name,
            format_utc_ms(start)
        );
        let digest = self
            .client
            .execute_plan(&self.builder.resume_market(&market.market_id, start))
            .await?;
        println!("Resumed: {digest}");
        Ok(())
    }

    pub async fn create_market(
        &self,
        feed_id: &str,
        interval_ms: u64,
        min_bet_mist: u64,
        start_time_ms: Option<u64>,
    ) -> AppResult<()> {
        if interval_ms == 0 {
            return Err(AppError::Config(
                "interval_ms must be greater than zero".into(),
            ));
        }
        let start = start_time_ms
            .unwrap_or_else(|| align_to_next_interval(self.clock.now_ms(), interval_ms));
        println!(
            "Creating market: start={}  interval={interval_ms}ms  min bet={}",
            format_utc_ms(start),
            format_mist(min_bet_mist)
        );
        let plan = self
            .builder
            .create_market(feed_id, interval_ms, min_bet_mist, start)?;
        let digest = self.client.execute_plan(&plan).await?;
        println!("Created: {digest}");
        Ok(())
    }

    /// Split off an exact-amount coin, then bet it on the live round.
    pub async fn bet(&self, market_arg: &str, direction: u8, amount_mist: u64) -> AppResult<()> {
        let market = self.config.resolve_market(market_arg)?;
        let coin_id = self.client.split_coin(amount_mist).await?;
        let digest = self
            .client
            .execute_plan(&self.builder.place_bet(&market.market_id, direction, &coin_id))
            .await?;
        println!(
            "Bet {} {} on {}: {digest}",
            format_mist(amount_mist),
            direction_label(direction),
            market.name
        );
        Ok(())
    }

    pub async fn redeem(&self, market_arg: &str, ticket: &str) -> AppResult<()> {
        let market = self.config.resolve_market(market_arg)?;
        let digest = self
            .client
            .execute_plan(&self.builder.redeem(&market.market_id, &[ticket.to_string()]))
            .await?;
        println!("Redeemed {ticket}: {digest}");
        Ok(())
    }

    /// Redeem every owned ticket whose round reached a terminal state, in
    /// one batched transaction. Tickets in open rounds are reported and
    /// left alone.
    pub async fn redeem_all(&self, market_arg: &str) -> AppResult<()> {
        let market = self.config.resolve_market(market_arg)?;
        let tickets = self
            .client
            .owned_tickets(&self.config.contracts.package_id, Some(&market.market_id))
            .await?;
        if tickets.is_empty() {
            println!("No tickets to redeem.");
            return Ok(());
        }

        let redeemable = self.redeemable_rounds(&market.market_id).await?;
        let (ready, waiting): (Vec<_>, Vec<_>) = tickets
            .into_iter()
            .partition(|ticket| redeemable.contains(&ticket.round_number));

        if ready.is_empty() {
            println!(
                "No redeemable tickets ({} in rounds not yet settled).",
                waiting.len()
            );
            return Ok(());
        }
        if !waiting.is_empty() {
            println!("Skipping {} ticket(s) in rounds not yet settled.", waiting.len());
        }

        let ids: Vec<String> = ready.iter().map(|ticket| ticket.object_id.clone()).collect();
        let digest = self
            .client
            .execute_plan(&self.builder.redeem(&market.market_id, &ids))
            .await?;
        println!("Redeemed {} ticket(s): {digest}", ids.len());
        Ok(())
    }

    /// Round numbers currently safe to redeem against.
    async fn redeemable_rounds(&self, market_id: &str) -> AppResult<HashSet<u64>> {
        let scan = self
            .client
            .market_state(market_id)
            .await?
            .map_or(FALLBACK_ROUND_SCAN, |state| state.round_count);
        let rounds = self
            .client
            .recent_rounds(market_id, scan)
            .await?
            .map(|(_, rounds)| rounds)
            .unwrap_or_default();
        Ok(rounds
            .iter()
            .filter(|round| {
                RoundStatus::from_raw(round.status)
                    .is_some_and(|status| status.is_redeemable())
            })
            .map(|round| round.round_number)
            .collect())
    }

    pub async fn update_config(
        &self,
        fee_bps: u64,
        settler_reward_bps: u64,
        price_tolerance_ms: u64,
    ) -> AppResult<()> {
        let plan = self
            .builder
            .update_config(fee_bps, settler_reward_bps, price_tolerance_ms);
        let digest = self.client.execute_plan(&plan).await?;
        println!(
            "Updated registry config (fee={fee_bps}bps, settler reward={settler_reward_bps}bps, \
             tolerance={price_tolerance_ms}ms): {digest}"
        );
        Ok(())
    }

    /// Market header plus the registry-wide settlement parameters.
    pub async fn info(&self, market_arg: Option<&str>) -> AppResult<()> {
        let market = self.resolve_or_default(market_arg)?;
        let state = self
            .client
            .market_state(&market.market_id)
            .await?
            .ok_or_else(|| {
                AppError::Market(format!("market object unreadable: {}", market.market_id))
            })?;
        print_market_header(&market.name, &state);
        match self
            .client
            .registry_config(&self.config.contracts.registry_id)
            .await?
        {
            Some(registry) => println!(
                "Registry  fee={}bps  settler_reward={}bps  price_tolerance={}ms",
                registry.fee_bps, registry.settler_reward_bps, registry.price_tolerance_ms
            ),
            None => println!("Registry  (unreadable)"),
        }
        Ok(())
    }

    /// Recent rounds, oldest first so the latest ends up at the bottom.
    pub async fn rounds(&self, market_arg: Option<&str>, count: u64) -> AppResult<()> {
        let market = self.resolve_or_default(market_arg)?;
        let (state, rounds) = self
            .client
            .recent_rounds(&market.market_id, count)
            .await?
            .ok_or_else(|| {
                AppError::Market(format!("market object unreadable: {}", market.market_id))
            })?;
        print_market_header(&market.name, &state);
        if rounds.is_empty() {
            println!("  (no rounds)");
            return Ok(());
        }
        for round in &rounds {
            print_round(round);
        }
        Ok(())
    }

    /// Owned tickets, across all markets unless one is named.
    pub async fn my_tickets(&self, market_arg: Option<&str>) -> AppResult<()> {
        let market_id = match market_arg {
            Some(arg) => Some(self.config.resolve_market(arg)?.market_id),
            None => None,
        };
        let tickets = self
            .client
            .owned_tickets(&self.config.contracts.package_id, market_id.as_deref())
            .await?;
        if tickets.is_empty() {
            println!("No tickets found.");
            return Ok(());
        }
        for (index, ticket) in tickets.iter().enumerate() {
            println!(
                "Ticket #{}: id={}  round={}  direction={}  amount={}",
                index + 1,
                ticket.object_id,
                ticket.round_number,
                direction_label(ticket.direction),
                format_mist(ticket.amount)
            );
        }
        Ok(())
    }
}

fn print_catch_up(name: &str, result: &CatchUpResult) {
    if result.did_reset {
        println!("{name}: skipped stale rounds via pause + resume");
    }
    if result.settled_rounds > 0 {
        println!("{name}: settled {} round(s)", result.settled_rounds);
    } else if !result.did_reset {
        println!("{name}: nothing to settle");
    }
    if result.retry_count > 0 || result.fail_count > 0 {
        println!(
            "{name}: {} retries, {} failures",
            result.retry_count, result.fail_count
        );
    }
    if let Some(error) = &result.last_error {
        println!("{name}: last error: {error}");
    }
}

fn print_market_header(name: &str, state: &MarketState) {
    println!(
        "{}  status={}  interval={}s  rounds={}  current={}  upcoming={}",
        name,
        state.status,
        state.interval_ms / 1000,
        state.round_count,
        state.current_round,
        state.upcoming_round
    );
}

fn print_round(round: &RoundData) {
    let status = RoundStatus::from_raw(round.status)
        .map_or_else(|| round.status.to_string(), |status| status.to_string());
    let result = match round.result {
        None => "-".to_string(),
        Some(code) => RoundResult::from_raw(code)
            .map_or_else(|| code.to_string(), |result| result.to_string()),
    };
    println!(
        "  Round #{:>3}  {:<9}  start={}  open={:>12}  close={:>12}  result={:<4}",
        round.round_number,
        status,
        format_clock_time(round.start_time_ms),
        format_price(round.open_price),
        format_price(round.close_price),
        result
    );
    println!(
        "                UP: {:>3} bets  {:>14}   DOWN: {:>3} bets  {:>14}   \
         total={:>14}  pool={:>14}  prize={:>14}",
        round.up_count,
        format_mist(round.up_amount),
        round.down_count,
        format_mist(round.down_amount),
        format_mist(round.total_bet_amount()),
        format_mist(round.pool_value),
        format_mist(round.prize_pool)
    );
}

fn direction_label(direction: u8) -> &'static str {
    if direction == 0 {
        "UP"
    } else {
        "DOWN"
    }
}

/// MIST to whole SUI at four decimal places.
fn format_mist(mist: u64) -> String {
    let value = Decimal::from(mist) / Decimal::from(1_000_000_000_u64);
    format!("{value:.4} SUI")
}

/// Oracle price at its native precision, with a floor of four places.
fn format_price(quote: Option<PriceQuote>) -> String {
    match quote {
        None => "-".to_string(),
        Some(quote) => {
            let places = quote.expo.max(4) as usize;
            let value = quote.to_decimal();
            format!("{value:.places$}")
        }
    }
}

fn format_utc_ms(unix_ms: u64) -> String {
    i64::try_from(unix_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(|| format!("{unix_ms}ms"))
}

fn format_clock_time(unix_ms: u64) -> String {
    i64::try_from(unix_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|ts| ts.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mist_formats_to_four_places() {
        assert_eq!(format_mist(1_000_000_000), "1.0000 SUI");
        assert_eq!(format_mist(100_000_000), "0.1000 SUI");
        assert_eq!(format_mist(12_340_000_000), "12.3400 SUI");
        assert_eq!(format_mist(0), "0.0000 SUI");
    }

    #[test]
    fn prices_use_native_precision_with_a_floor() {
        assert_eq!(format_price(None), "-");
        assert_eq!(
            format_price(Some(PriceQuote {
                magnitude: 812_345_678,
                expo: 8,
            })),
            "8.12345678"
        );
        assert_eq!(format_price(Some(PriceQuote { magnitude: 5, expo: 0 })), "5.0000");
    }

    #[test]
    fn directions_decode_to_labels() {
        assert_eq!(direction_label(0), "UP");
        assert_eq!(direction_label(1), "DOWN");
    }

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(format_utc_ms(1_700_000_000_123), "2023-11-14T22:13:20.123Z");
        assert_eq!(format_clock_time(1_700_000_000_000), "22:13:20");
        assert_eq!(format_clock_time(u64::MAX), "-");
    }

    #[test]
    fn ops_requires_contract_ids() {
        let config = AppConfig::default();
        assert!(matches!(Ops::new(config), Err(AppError::Config(_))));
    }
}
