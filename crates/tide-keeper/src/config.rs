//! Application configuration.
//!
//! Everything deployment-specific lives in one TOML file: endpoints,
//! deployed object ids, signer settings, scheduler tuning, and the list of
//! markets to keep. Missing fields fall back to the defaults below; missing
//! contract ids are a startup error, not a default.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use tide_chain::ContractIds;
use tide_core::MarketConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    pub signer: SignerConfig,
    pub keeper: KeeperConfig,
    pub server: ServerConfig,
    pub markets: Vec<MarketConfig>,
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config {path}: {e}")))
    }

    /// Full startup validation for the daemon: contract ids present, at
    /// least one market, every market entry well formed.
    pub fn validate(&self) -> AppResult<()> {
        self.contracts.validate()?;
        if self.markets.is_empty() {
            return Err(AppError::Config(
                "no [[markets]] configured; the keeper has nothing to settle".into(),
            ));
        }
        for market in &self.markets {
            market.validate()?;
        }
        Ok(())
    }

    /// Resolve a market argument: a configured display name
    /// (case-insensitive) or a raw object id. Raw ids carry no feed id, so
    /// they can be inspected and administered but not settled.
    pub fn resolve_market(&self, name_or_id: &str) -> AppResult<MarketConfig> {
        if let Some(market) = self
            .markets
            .iter()
            .find(|market| market.name.eq_ignore_ascii_case(name_or_id))
        {
            return Ok(market.clone());
        }
        if name_or_id.starts_with("0x") {
            return Ok(MarketConfig {
                name: name_or_id.to_string(),
                market_id: name_or_id.to_string(),
                feed_id: String::new(),
                price_info_object_id: String::new(),
            });
        }
        let names: Vec<&str> = self.markets.iter().map(|m| m.name.as_str()).collect();
        Err(AppError::Market(format!(
            "unknown market \"{}\"; configured: {}",
            name_or_id,
            names.join(", ")
        )))
    }

    /// First configured market, the default subject for display commands.
    pub fn default_market(&self) -> AppResult<&MarketConfig> {
        self.markets
            .first()
            .ok_or_else(|| AppError::Config("no [[markets]] configured".into()))
    }
}

/// Endpoints the keeper talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Fullnode JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Hermes price service endpoint.
    #[serde(default = "default_hermes_url")]
    pub hermes_url: String,
}

fn default_rpc_url() -> String {
    "https://fullnode.testnet.sui.io:443".to_string()
}

fn default_hermes_url() -> String {
    tide_oracle::TESTNET_ENDPOINT.to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            hermes_url: default_hermes_url(),
        }
    }
}

/// Object ids of the deployed contracts. No defaults except the system
/// clock; these come from the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    #[serde(default)]
    pub package_id: String,
    #[serde(default)]
    pub registry_id: String,
    #[serde(default)]
    pub admin_cap_id: String,
    #[serde(default)]
    pub pyth_package_id: String,
    #[serde(default)]
    pub pyth_state_id: String,
    #[serde(default)]
    pub wormhole_state_id: String,
    /// Shared clock object, `0x6` on every network.
    #[serde(default = "default_clock_id")]
    pub clock_id: String,
}

fn default_clock_id() -> String {
    "0x6".to_string()
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            package_id: String::new(),
            registry_id: String::new(),
            admin_cap_id: String::new(),
            pyth_package_id: String::new(),
            pyth_state_id: String::new(),
            wormhole_state_id: String::new(),
            clock_id: default_clock_id(),
        }
    }
}

impl ContractsConfig {
    /// The ids in the shape the transaction builder wants.
    pub fn ids(&self) -> ContractIds {
        ContractIds {
            package_id: self.package_id.clone(),
            registry_id: self.registry_id.clone(),
            admin_cap_id: self.admin_cap_id.clone(),
            pyth_package_id: self.pyth_package_id.clone(),
            pyth_state_id: self.pyth_state_id.clone(),
            wormhole_state_id: self.wormhole_state_id.clone(),
            clock_id: self.clock_id.clone(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        for (label, id) in [
            ("contracts.package_id", &self.package_id),
            ("contracts.registry_id", &self.registry_id),
            ("contracts.admin_cap_id", &self.admin_cap_id),
            ("contracts.pyth_package_id", &self.pyth_package_id),
            ("contracts.pyth_state_id", &self.pyth_state_id),
            ("contracts.wormhole_state_id", &self.wormhole_state_id),
            ("contracts.clock_id", &self.clock_id),
        ] {
            if !id.starts_with("0x") || id.len() < 3 {
                return Err(AppError::Config(format!(
                    "{label} is missing or malformed: {id:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Signing key and gas settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Environment variable holding the hex-encoded Ed25519 seed.
    #[serde(default = "default_key_env")]
    pub key_env: String,
    /// Gas budget per transaction, in MIST.
    #[serde(default = "default_gas_budget_mist")]
    pub gas_budget_mist: u64,
}

fn default_key_env() -> String {
    "TIDE_SECRET_KEY".to_string()
}

fn default_gas_budget_mist() -> u64 {
    100_000_000
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
            gas_budget_mist: default_gas_budget_mist(),
        }
    }
}

/// Scheduler and retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Sweep cadence for runners that lost their wake-up timer.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Settle this long after a round's nominal close.
    #[serde(default = "default_settle_buffer_ms")]
    pub settle_buffer_ms: u64,
    /// Wake-up delay when the next round's start time cannot be read.
    #[serde(default = "default_reschedule_retry_ms")]
    pub reschedule_retry_ms: u64,
    /// Retries per settlement attempt before giving up on the round.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles on each further retry.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Registry-config cache lifetime.
    #[serde(default = "default_config_cache_ttl_ms")]
    pub config_cache_ttl_ms: u64,
    /// How long shutdown waits for an in-flight settlement.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

fn default_heartbeat_interval_ms() -> u64 {
    10_000
}

fn default_settle_buffer_ms() -> u64 {
    500
}

fn default_reschedule_retry_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1_000
}

fn default_config_cache_ttl_ms() -> u64 {
    10_000
}

fn default_shutdown_grace_ms() -> u64 {
    10_000
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            settle_buffer_ms: default_settle_buffer_ms(),
            reschedule_retry_ms: default_reschedule_retry_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            config_cache_ttl_ms: default_config_cache_ttl_ms(),
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

/// Health/metrics HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_enabled")]
    pub enabled: bool,
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_enabled() -> bool {
    true
}

fn default_server_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_server_enabled(),
            bind: default_server_bind(),
        }
    }
}
