//! Daemon wiring and lifecycle.
//!
//! `Application::new` builds the whole stack from configuration: signer,
//! fullnode client, Hermes client, engine ports, scheduler, and metrics hub.
//! `run` supervises the scheduler until ctrl-c, then gives any in-flight
//! settlement a bounded grace period before aborting the task.

use crate::adapters::{ChainAdapter, ExecutorAdapter};
use crate::config::AppConfig;
use crate::error::AppResult;
use std::sync::Arc;
use std::time::Duration;
use tide_chain::{KeySource, KeypairSigner, SuiClient, TxBuilder};
use tide_engine::{
    CatchUpEngine, Clock, DynChainReader, DynTxExecutor, MarketStateReader, MetricsHub,
    RetryPolicy, Scheduler, SchedulerConfig, SystemClock,
};
use tide_oracle::HermesClient;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// The keeper daemon: one scheduler task plus the optional metrics server.
pub struct Application {
    config: AppConfig,
    hub: Arc<MetricsHub>,
    scheduler: Scheduler,
}

impl Application {
    /// Wire every component from configuration. Fails fast on bad config or
    /// a missing signing key; network endpoints are not probed here.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

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

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let chain: DynChainReader = Arc::new(ChainAdapter::new(client.clone()));
        let reader = Arc::new(MarketStateReader::new(
            chain,
            clock.clone(),
            config.contracts.registry_id.clone(),
            config.keeper.config_cache_ttl_ms,
        ));
        let executor: DynTxExecutor = Arc::new(ExecutorAdapter::new(client, builder, oracle));
        let engine = CatchUpEngine::new(
            reader.clone(),
            executor,
            RetryPolicy {
                max_retries: config.keeper.max_retries,
                base_delay_ms: config.keeper.retry_base_delay_ms,
            },
            clock.clone(),
        );

        let hub = Arc::new(MetricsHub::new(clock.clone()));
        let scheduler = Scheduler::new(
            engine,
            reader,
            hub.clone(),
            clock,
            SchedulerConfig {
                heartbeat_interval_ms: config.keeper.heartbeat_interval_ms,
                settle_buffer_ms: config.keeper.settle_buffer_ms,
                reschedule_retry_ms: config.keeper.reschedule_retry_ms,
            },
            config.markets.clone(),
        );

        Ok(Self {
            config,
            hub,
            scheduler,
        })
    }

    /// Run until ctrl-c. All market state lives in the scheduler task; this
    /// method only supervises it and the metrics server.
    pub async fn run(self) -> AppResult<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut scheduler_handle = tokio::spawn(self.scheduler.run(shutdown_rx));

        let server_handle = if self.config.server.enabled {
            let hub = self.hub.clone();
            let bind = self.config.server.bind.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = tide_server::run_server(hub, &bind).await {
                    error!(error = %e, "Metrics server failed");
                }
            }))
        } else {
            None
        };

        let scheduler_done = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                false
            }
            _ = &mut scheduler_handle => {
                warn!("Scheduler task exited before shutdown");
                true
            }
        };

        let _ = shutdown_tx.send(true);
        if !scheduler_done {
            let grace = Duration::from_millis(self.config.keeper.shutdown_grace_ms);
            if tokio::time::timeout(grace, &mut scheduler_handle)
                .await
                .is_err()
            {
                warn!(
                    grace_ms = self.config.keeper.shutdown_grace_ms,
                    "Settlement still in flight after grace period, aborting"
                );
                scheduler_handle.abort();
            }
        }

        if let Some(handle) = server_handle {
            handle.abort();
        }
        info!("Keeper stopped");
        Ok(())
    }
}
