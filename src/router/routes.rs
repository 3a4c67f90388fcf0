// Route allocation types
// This file defines the multi-venue allocation produced by the optimizer
// and consumed by the executor and the quote surface.

use crate::venues::adapter::{VenueId, BPS_DENOMINATOR};
use serde::Serialize;

/// One leg of a multi-venue allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteLeg {
    pub venue: VenueId,
    /// Input amount routed through this venue.
    pub amount_in: u128,
    /// Share of the requested amount, floor(amount_in * 10000 / request).
    pub percentage_bps: u32,
}

/// Whether the allocation covers the full requested amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FillStatus {
    Full,
    /// Aggregate venue capacity fell short; `unfilled` is the remainder.
    Partial { unfilled: u128 },
}

impl FillStatus {
    pub fn is_full(&self) -> bool {
        matches!(self, FillStatus::Full)
    }
}

/// Ordered multi-venue allocation for a single swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteAllocation {
    pub legs: Vec<RouteLeg>,
    /// Sum of leg inputs; equals the requested amount on a full fill.
    pub total_in: u128,
    pub fill: FillStatus,
}

impl RouteAllocation {
    pub fn empty() -> Self {
        Self {
            legs: Vec::new(),
            total_in: 0,
            fill: FillStatus::Partial { unfilled: 0 },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    /// Sum of leg percentages. At full allocation this lands within
    /// (legs - 1) bps of 10000 because each floor division truncates.
    pub fn percentage_total_bps(&self) -> u32 {
        self.legs.iter().map(|leg| leg.percentage_bps).sum()
    }
}

/// Optimizer output: the allocation plus its fee-adjusted output estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteQuote {
    pub allocation: RouteAllocation,
    pub expected_out: u128,
}

impl RouteQuote {
    pub fn empty() -> Self {
        Self {
            allocation: RouteAllocation::empty(),
            expected_out: 0,
        }
    }
}

/// Truncating basis-point product: `amount * bps / 10000`.
pub(crate) fn apply_bps(amount: u128, bps: u32) -> u128 {
    amount.saturating_mul(u128::from(bps)) / BPS_DENOMINATOR
}
