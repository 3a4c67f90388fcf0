// Configuration management module
// This file handles loading of runtime settings from environment variables
// and resolves them into the immutable protocol parameters the core runs on.

use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::venues::adapter::BPS_DENOMINATOR;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Maximum legs per route allocation (default 3).
    pub max_route_legs: Option<usize>,
    /// Fraction of a venue's reported liquidity usable per swap, in bps
    /// (default 3000 = 30%), bounding per-venue price impact.
    pub venue_capacity_bps: Option<u32>,
    /// Constant slippage factor applied to every leg estimate, in bps
    /// (default 9950 = assume 0.5% impact).
    pub slippage_factor_bps: Option<u32>,
    /// Minimum seconds between commit and the earliest valid reveal
    /// (default 60).
    pub min_reveal_delay_secs: Option<u64>,
    /// Maximum seconds a commit deadline may sit in the future
    /// (default 3600).
    pub max_commit_window_secs: Option<u64>,
    /// Maximum revealed entries settled per batch call (default 8).
    pub max_batch_size: Option<usize>,
    /// Synthetic per-order gas figure reported by batch settlement.
    pub batch_gas_saved_per_order: Option<u64>,
    /// Concurrency control for executor entry points (default 64).
    pub max_inflight: Option<usize>,
    /// Admission rate limit per second; unset uses the control-plane
    /// default.
    pub admission_rate_per_sec: Option<u32>,
    /// Optional JSON snapshot used to seed the venue registry at startup.
    pub venues_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Resolve optional settings into validated protocol parameters.
    pub fn protocol_params(&self) -> Result<ProtocolParams> {
        let defaults = ProtocolParams::default();
        let params = ProtocolParams {
            max_route_legs: self.max_route_legs.unwrap_or(defaults.max_route_legs),
            venue_capacity_bps: self
                .venue_capacity_bps
                .unwrap_or(defaults.venue_capacity_bps),
            slippage_factor_bps: self
                .slippage_factor_bps
                .unwrap_or(defaults.slippage_factor_bps),
            min_reveal_delay: self
                .min_reveal_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.min_reveal_delay),
            max_commit_window: self
                .max_commit_window_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.max_commit_window),
            max_batch_size: self.max_batch_size.unwrap_or(defaults.max_batch_size),
            batch_gas_saved_per_order: self
                .batch_gas_saved_per_order
                .unwrap_or(defaults.batch_gas_saved_per_order),
        };

        if params.max_route_legs == 0 {
            bail!("max_route_legs must be at least 1");
        }
        if params.venue_capacity_bps == 0 || u128::from(params.venue_capacity_bps) > BPS_DENOMINATOR
        {
            bail!(
                "venue_capacity_bps must be in (0, {}], got {}",
                BPS_DENOMINATOR,
                params.venue_capacity_bps
            );
        }
        if params.slippage_factor_bps == 0
            || u128::from(params.slippage_factor_bps) > BPS_DENOMINATOR
        {
            bail!(
                "slippage_factor_bps must be in (0, {}], got {}",
                BPS_DENOMINATOR,
                params.slippage_factor_bps
            );
        }
        if params.min_reveal_delay >= params.max_commit_window {
            bail!(
                "min_reveal_delay_secs ({}s) must be below max_commit_window_secs ({}s)",
                params.min_reveal_delay.as_secs(),
                params.max_commit_window.as_secs()
            );
        }
        if params.max_batch_size == 0 {
            bail!("max_batch_size must be at least 1");
        }

        Ok(params)
    }

    pub fn max_inflight(&self) -> usize {
        self.max_inflight.unwrap_or(64)
    }
}

/// Immutable protocol parameters shared by the optimizer, ledger, and
/// executor.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolParams {
    pub max_route_legs: usize,
    pub venue_capacity_bps: u32,
    pub slippage_factor_bps: u32,
    pub min_reveal_delay: Duration,
    pub max_commit_window: Duration,
    pub max_batch_size: usize,
    pub batch_gas_saved_per_order: u64,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            max_route_legs: 3,
            venue_capacity_bps: 3_000,
            slippage_factor_bps: 9_950,
            min_reveal_delay: Duration::from_secs(60),
            max_commit_window: Duration::from_secs(3_600),
            max_batch_size: 8,
            // Placeholder figure for reporting; not a measured value.
            batch_gas_saved_per_order: 120_000,
        }
    }
}
