// Paper venue executor
// Deterministic fill engine backed by the venue registry: output is the
// fee-adjusted input, shifted by a configurable drift to model price
// movement between quote and execution. Fills are instantaneous, so the
// forwarded deadline is never binding here.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::VenueError;
use crate::venues::adapter::{
    Address, Token, VenueExecutor, VenueId, BPS_DENOMINATOR,
};
use crate::venues::registry::VenueRegistry;

pub struct PaperVenue {
    registry: Arc<VenueRegistry>,
    /// Signed bps applied on top of the fee-adjusted output. Negative drift
    /// models the price moving against the trade mid-flight.
    drift_bps: AtomicI32,
}

impl PaperVenue {
    pub fn new(registry: Arc<VenueRegistry>) -> Self {
        Self {
            registry,
            drift_bps: AtomicI32::new(0),
        }
    }

    pub fn set_drift_bps(&self, bps: i32) {
        self.drift_bps.store(bps, Ordering::Relaxed);
    }

    fn apply_drift(amount: u128, drift_bps: i32) -> u128 {
        let factor = if drift_bps >= 0 {
            BPS_DENOMINATOR + drift_bps as u128
        } else {
            BPS_DENOMINATOR.saturating_sub(drift_bps.unsigned_abs() as u128)
        };
        amount.saturating_mul(factor) / BPS_DENOMINATOR
    }
}

#[async_trait]
impl VenueExecutor for PaperVenue {
    async fn execute_exact_input(
        &self,
        venue: &VenueId,
        token_in: &Token,
        token_out: &Token,
        amount_in: u128,
        recipient: &Address,
        _deadline: u64,
    ) -> Result<u128, VenueError> {
        let candidate = self
            .registry
            .candidate_for(token_in, token_out, venue)
            .await
            .ok_or_else(|| VenueError::new(venue.clone(), "unknown venue for pair"))?;
        if amount_in > candidate.liquidity {
            return Err(VenueError::new(venue.clone(), "amount exceeds venue liquidity"));
        }

        let after_fee =
            amount_in.saturating_mul(BPS_DENOMINATOR - candidate.fee_bps as u128) / BPS_DENOMINATOR;
        let amount_out = Self::apply_drift(after_fee, self.drift_bps.load(Ordering::Relaxed));
        debug!(
            venue = %venue,
            amount_in = amount_in,
            amount_out = amount_out,
            recipient = %recipient,
            "paper fill"
        );
        Ok(amount_out)
    }
}
