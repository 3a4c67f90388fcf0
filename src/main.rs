use anyhow::{anyhow, Context, Result};
use sealed_aggr::config::{AppConfig, ProtocolParams};
use sealed_aggr::control::AdmissionControl;
use sealed_aggr::custody::CustodyVault;
use sealed_aggr::ledger::CommitRevealLedger;
use sealed_aggr::router::ProtectedSwapExecutor;
use sealed_aggr::venues::{PaperVenue, VenueRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal executor error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let params = config.protocol_params().context("resolve protocol parameters")?;

    let registry = Arc::new(VenueRegistry::new());
    if let Some(path) = &config.venues_path {
        let loaded = registry
            .load_snapshot(path)
            .await
            .with_context(|| format!("seed venue registry from {}", path.display()))?;
        info!(venues = loaded, "venue registry seeded");
    } else {
        warn!("venue snapshot not provided; registry starts empty");
    }

    let paper = Arc::new(PaperVenue::new(Arc::clone(&registry)));
    let ledger = Arc::new(CommitRevealLedger::new(params));
    let vault = Arc::new(CustodyVault::new());
    let admission = AdmissionControl::new(config.max_inflight(), config.admission_rate_per_sec);

    let executor = Arc::new(ProtectedSwapExecutor::new(
        params,
        Arc::clone(&ledger),
        Arc::clone(&vault),
        registry,
        paper,
        admission,
    ));

    let app = App {
        config: Arc::new(config),
        params,
        executor,
        ledger,
    };
    app.run().await
}

struct App {
    config: Arc<AppConfig>,
    params: ProtocolParams,
    executor: Arc<ProtectedSwapExecutor>,
    ledger: Arc<CommitRevealLedger>,
}

impl App {
    async fn run(self) -> Result<()> {
        info!(
            max_route_legs = self.params.max_route_legs,
            venue_capacity_bps = self.params.venue_capacity_bps,
            min_reveal_delay_secs = self.params.min_reveal_delay.as_secs(),
            max_commit_window_secs = self.params.max_commit_window.as_secs(),
            max_batch_size = self.params.max_batch_size,
            max_inflight = self.config.max_inflight(),
            "protected swap executor online"
        );

        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let swap_stats = self.executor.stats();
                    let ledger_stats = self.ledger.stats().await;
                    info!(
                        total_swaps = swap_stats.total_swaps,
                        successful = swap_stats.successful_swaps,
                        failed = swap_stats.failed_swaps,
                        success_rate = swap_stats.success_rate,
                        orders_settled = swap_stats.orders_settled,
                        gas_saved_total = swap_stats.gas_saved_total,
                        tracked_commitments = ledger_stats.tracked_commitments,
                        queued_reveals = ledger_stats.queued_reveals,
                        consumed_hashes = ledger_stats.consumed_hashes,
                        "executor heartbeat"
                    );
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, exiting");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn init_tracing() -> Result<()> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
